use std::env;
use std::error::Error;

use survey_client::api::{SurveyApi, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use survey_client::theme::ThemeStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("theme") => theme_command(args.get(1).map(String::as_str)),
        Some("questions") => questions_command().await?,
        Some("responses") => {
            let page = match args.get(1) {
                Some(raw) => raw.parse()?,
                None => DEFAULT_PAGE,
            };
            responses_command(page, args.get(2).map(String::as_str)).await?;
        }
        Some("certificate") => {
            let id = args
                .get(1)
                .ok_or("certificate requires an id")?
                .parse()?;
            let api = SurveyApi::new()?;
            println!("{}", api.certificate_download_url(id));
        }
        _ => usage(),
    }

    Ok(())
}

fn theme_command(action: Option<&str>) {
    let (store, _flag) = ThemeStore::system();
    match action {
        Some("toggle") => {
            store.toggle();
            println!("theme is now {}", store.current());
        }
        _ => println!("theme is {}", store.current()),
    }
}

async fn questions_command() -> Result<(), Box<dyn Error>> {
    let api = SurveyApi::new()?;
    let list = api.fetch_questions().await?;
    for question in &list.question {
        let marker = if question.is_required() { " (required)" } else { "" };
        println!("{} [{}]{}", question.text, question.question_type, marker);
    }
    Ok(())
}

async fn responses_command(page: u32, email: Option<&str>) -> Result<(), Box<dyn Error>> {
    let api = SurveyApi::new()?;
    let responses = api.fetch_responses(page, DEFAULT_PAGE_SIZE, email).await?;
    for response in &responses.question_response {
        println!(
            "{} <{}> - {} certificate(s)",
            response.full_name,
            response.email_address,
            response.certificates.len()
        );
        for certificate in &response.certificates {
            println!("    {} -> {}", certificate.name, api.certificate_download_url(certificate.id));
        }
    }
    println!(
        "page {} of {} ({} total)",
        responses.current_page, responses.last_page, responses.total_count
    );
    Ok(())
}

fn usage() {
    eprintln!("usage: survey-cli <command>");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  theme [toggle]            show or flip the active theme");
    eprintln!("  questions                 list the survey questions");
    eprintln!("  responses [page] [email]  list submitted responses");
    eprintln!("  certificate <id>          print the download URL for a certificate");
}
