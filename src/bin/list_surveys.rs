use anyhow::Result;
use survey_client::api::ApiClient;
use survey_client::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = AppConfig::from_env();
    println!("===== Survey Backend Smoke Check =====");
    println!("Backend: {}", config.api_base_url);

    let api = ApiClient::new(&config)?;

    let categories = api.categories().await?;
    println!("\nCategories ({}):", categories.len());
    for category in &categories {
        println!(
            "  [{}] {} - {}",
            category.id,
            category.name,
            category.description.as_deref().unwrap_or("(no description)")
        );
    }

    let surveys = api.surveys().await?;
    println!("\nSurveys ({}):", surveys.len());
    for survey in &surveys {
        let category_name = survey
            .category_id
            .and_then(|category_id| {
                categories
                    .iter()
                    .find(|category| category.id == category_id)
            })
            .map(|category| category.name.as_str())
            .unwrap_or("Uncategorized");
        println!(
            "  [{}] {} ({}, {} questions, {} min, {} responses)",
            survey.id.unwrap_or_default(),
            survey.title,
            category_name,
            survey.questions.len(),
            survey.duration_minutes,
            survey.response_count.unwrap_or_default()
        );
    }

    println!("\n===== Check Complete =====");
    Ok(())
}
