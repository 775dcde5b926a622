use dotenvy::dotenv;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_API_URL: &str = "http://localhost:3000";

fn is_dry_run() -> bool {
    !std::env::args().any(|a| a == "--apply")
}

fn seed_path() -> String {
    std::env::args()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .unwrap_or_else(|| "tools/seed_courses/courses.json".to_string())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Database { courses: Vec<SeedCourse> },
    List(Vec<SeedCourse>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeedCourse {
    name: String,
    credit: u32,
    category: String,
    #[serde(default)]
    teacher: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExistingCourse {
    name: String,
    #[serde(default)]
    teacher: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let api_url = env::var("COURSEDESK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let token = env::var("COURSEDESK_TOKEN").ok();

    let raw = std::fs::read_to_string(seed_path())?;
    let seeds = match serde_json::from_str::<SeedFile>(&raw)? {
        SeedFile::Database { courses } => courses,
        SeedFile::List(courses) => courses,
    };

    let client = Client::new();
    let existing = fetch_existing(&client, &api_url).await?;

    let dry_run = is_dry_run();
    let mut created = 0;

    for seed in &seeds {
        if is_present(&existing, seed) {
            continue;
        }

        if dry_run {
            println!("[DRY RUN] Would create course {:?} ({:?})", seed.name, seed.teacher);
        } else {
            create_course(&client, &api_url, token.as_deref(), seed).await?;
            println!("Created course {:?}", seed.name);
        }

        created += 1;
    }

    println!("Courses created: {} / {}", created, seeds.len());

    Ok(())
}

async fn fetch_existing(
    client: &Client,
    api_url: &str,
) -> Result<Vec<ExistingCourse>, Box<dyn std::error::Error>> {
    let courses = client
        .get(format!("{}/courses", api_url.trim_end_matches('/')))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(courses)
}

fn is_present(existing: &[ExistingCourse], seed: &SeedCourse) -> bool {
    existing
        .iter()
        .any(|c| c.name == seed.name && c.teacher == seed.teacher)
}

async fn create_course(
    client: &Client,
    api_url: &str,
    token: Option<&str>,
    seed: &SeedCourse,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = client
        .post(format!("{}/courses", api_url.trim_end_matches('/')))
        .json(seed);
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }

    request.send().await?.error_for_status()?;

    Ok(())
}
