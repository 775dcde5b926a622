pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod forms;
pub mod models;
pub mod render;
pub mod session;
pub mod state;

use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::cli::{Args, Command};
use crate::client::{CourseApi, HttpCourseApi};
use crate::config::Settings;
use crate::controller::{
    AuthFlow, Confirm, ConsoleNotifier, CourseEditor, FixedAnswer, ListingController,
    ListingOptions, StdinConfirm,
};
use crate::error::AppError;
use crate::forms::{CourseForm, FieldErrors, LoginForm, RegisterForm};
use crate::models::CourseId;
use crate::session::{AuthContext, SessionStore};
use crate::state::AppState;

pub async fn run(args: Args) -> Result<()> {
    debug!(?args, "Starting coursedesk with arguments");

    let mut settings = Settings::from_env();
    if let Some(url) = args.api_url {
        settings.api_url = url;
    }
    if let Some(path) = args.session_file {
        settings.session_file = path;
    }

    match args.command {
        Command::Serve {
            bind,
            database_url,
            require_auth,
        } => {
            if let Some(bind) = bind {
                settings.bind = bind;
            }
            if let Some(url) = database_url {
                settings.database_url = url;
            }
            settings.require_auth |= require_auth;
            serve(&settings).await
        }
        command => run_client(command, &settings).await,
    }
}

/// Commands that talk to the course API as a client.
async fn run_client(command: Command, settings: &Settings) -> Result<()> {
    let auth = AuthContext::with_store(SessionStore::new(&settings.session_file));
    let api: Arc<dyn CourseApi> = Arc::new(HttpCourseApi::new(&settings.api_url, auth.clone())?);
    let notifier = ConsoleNotifier;

    match command {
        Command::Home => {
            println!("Welcome to coursedesk");
            println!("Course management against {}", settings.api_url);
            match auth.user() {
                Some(user) => println!("Signed in as {} <{}>", user.username, user.email),
                None => println!("Not signed in"),
            }
        }
        Command::List {
            search,
            teacher,
            page,
            client_sort,
        } => {
            let options = ListingOptions {
                client_resort: client_sort,
                ..Default::default()
            };
            let controller = ListingController::new(api, options);
            controller.preset(
                search.as_deref().unwrap_or_default(),
                teacher.as_deref().unwrap_or_default(),
            );
            controller.fetch_page().await;
            if page > 1 {
                controller.set_page(page).await;
            }
            print!("{}", render::listing(&controller.snapshot()));
        }
        Command::Browse => browse(api).await?,
        Command::Teachers => {
            let controller = ListingController::new(api, ListingOptions::default());
            for teacher in controller.fetch_teachers().await {
                println!("{teacher}");
            }
        }
        Command::Show { id } => {
            let course = api.fetch_course(&parse_id(&id)).await?;
            print!("{}", render::course_table(&[course]));
        }
        Command::Add {
            name,
            credit,
            category,
            teacher,
        } => {
            let form = CourseForm {
                name,
                teacher,
                credit,
                category,
            };
            let course = report_fields(CourseEditor::new(api).create(&form, &notifier).await)?;
            print!("{}", render::course_table(&[course]));
        }
        Command::Edit {
            id,
            name,
            credit,
            category,
            teacher,
        } => {
            let id = parse_id(&id);
            let editor = CourseEditor::new(api);
            let mut form = editor.load(&id).await?;
            if let Some(v) = name {
                form.name = v;
            }
            if let Some(v) = credit {
                form.credit = v;
            }
            if let Some(v) = category {
                form.category = v;
            }
            if let Some(v) = teacher {
                form.teacher = v;
            }
            let course = report_fields(editor.update(&id, &form, &notifier).await)?;
            print!("{}", render::course_table(&[course]));
        }
        Command::Delete { id, yes } => {
            let controller = ListingController::new(api, ListingOptions::default());
            let confirm: Box<dyn Confirm> = if yes {
                Box::new(FixedAnswer(true))
            } else {
                Box::new(StdinConfirm)
            };
            let outcome = controller
                .delete_course(&parse_id(&id), confirm.as_ref(), &notifier)
                .await;
            info!(?outcome, "delete finished");
        }
        Command::Login { email, password } => {
            let flow = AuthFlow::new(api, auth.clone());
            report_fields(flow.login(&LoginForm { email, password }, &notifier).await)?;
        }
        Command::Register {
            username,
            email,
            password,
            confirm_password,
        } => {
            let form = RegisterForm {
                username,
                email,
                password,
                confirm_password,
            };
            report_fields(AuthFlow::new(api, auth.clone()).register(&form, &notifier).await)?;
        }
        Command::Logout => {
            AuthFlow::new(api, auth.clone()).logout()?;
            println!("Signed out");
        }
        Command::Serve { .. } => bail!("serve runs the API; it has no client session"),
    }

    Ok(())
}

fn parse_id(raw: &str) -> CourseId {
    match raw.parse() {
        Ok(id) => id,
        Err(never) => match never {},
    }
}

/// Print field errors next to their field names before failing.
fn report_fields<T>(result: Result<T, AppError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(AppError::Validation(errors)) => {
            print_field_errors(&errors);
            bail!("{} field(s) invalid", errors.len())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        eprintln!("  {field}: {message}");
    }
}

async fn serve(settings: &Settings) -> Result<()> {
    let pool = db::connect(&settings.database_url, 5)
        .await
        .with_context(|| format!("Failed to open database {}", settings.database_url))?;

    let app = api::router(AppState {
        db: pool,
        require_auth: settings.require_auth,
    });

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind))?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

const BROWSE_HELP: &str = "commands: s <text> search | t [name] teacher | p <n> page | n next | b back | d <id> delete | r refresh | q quit";

/// Interactive listing. Typing a search goes through the same debounce as
/// the UI; the table is redrawn whenever a fetch settles.
async fn browse(api: Arc<dyn CourseApi>) -> Result<()> {
    let controller = ListingController::new(api, ListingOptions::default());
    let mut changes = controller.subscribe();
    let renderer = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let snapshot = changes.borrow_and_update().clone();
            if !snapshot.loading {
                print!("{}", render::listing(&snapshot));
                println!("{BROWSE_HELP}");
            }
        }
    });

    controller.mount().await;
    if !controller.snapshot().teachers.is_empty() {
        println!("Teachers: {}", controller.snapshot().teachers.join(", "));
    }

    loop {
        let line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).map(|n| (n, line))
        })
        .await??;
        let (read, line) = line;
        if read == 0 {
            break;
        }

        let line = line.trim_end_matches(['\r', '\n']);
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        match cmd {
            "s" | "search" => controller.update_search_text(rest),
            "t" | "teacher" => controller.update_teacher_filter(rest.trim()).await,
            "p" | "page" => match rest.trim().parse::<u32>() {
                Ok(page) => controller.set_page(page).await,
                Err(_) => eprintln!("not a page number: {rest}"),
            },
            "n" | "next" => controller.next_page().await,
            "b" | "back" => controller.prev_page().await,
            "r" | "refresh" => controller.request_refresh().await,
            "d" | "delete" if !rest.trim().is_empty() => {
                controller
                    .delete_course(&parse_id(rest.trim()), &StdinConfirm, &ConsoleNotifier)
                    .await;
            }
            "q" | "quit" => break,
            "" => {}
            _ => println!("{BROWSE_HELP}"),
        }
    }

    renderer.abort();
    Ok(())
}
