use std::sync::Arc;

use anyhow::Result;

use studybeat::api::{CarouselApi, DEFAULT_LIMIT, DEFAULT_PLATFORM};
use studybeat::auth::EnvCodeProvider;
use studybeat::gateway::{Gateway, ReqwestTransport};
use studybeat::logging;
use studybeat::model::SessionStore;
use studybeat::notify::{self, LogNavigator, UiEvents};
use studybeat::storage::FileStore;
use studybeat::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = AppConfig::from_env();

    let _log_guard = match logging::init_logging(&config.log_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!(base_url = %config.base_url, "=== StudyBeat client starting ===");

    let storage = Arc::new(FileStore::open(&config.storage_path)?);
    let (events, events_rx) = UiEvents::channel();
    let dispatcher = tokio::spawn(notify::dispatch_events(events_rx, Arc::new(LogNavigator)));

    let gateway = Arc::new(Gateway::new(
        &config,
        Arc::new(ReqwestTransport::new()),
        storage.clone(),
        events.clone(),
    ));
    let mut session = SessionStore::new(gateway.clone(), storage, events.clone(), Arc::new(EnvCodeProvider));

    session.auto_login().await;

    let command = std::env::args().nth(1).unwrap_or_else(|| "status".to_string());
    match command.as_str() {
        "status" => {}
        "wechat-login" => {
            if !session.wechat_login().await {
                println!("WeChat login failed, see the log for details");
            }
        }
        "logout" => session.logout().await,
        "carousel" => {
            let carousel = CarouselApi::new(gateway.clone());
            match carousel.query_active_carousel(DEFAULT_PLATFORM, DEFAULT_LIMIT).await {
                Ok(response) => {
                    for item in response.into_data().unwrap_or_default() {
                        println!("{:>4}  {}  {}", item.id, item.title, item.link_url);
                    }
                }
                Err(e) => println!("{}", e.user_message()),
            }
        }
        other => {
            println!("Unknown command '{other}'. Use status, wechat-login, logout or carousel.");
        }
    }

    print_status(&session);

    // Let queued notifications and scheduled redirects run before exiting.
    drop(session);
    drop(gateway);
    drop(events);
    dispatcher.await?;
    tokio::time::sleep(studybeat::gateway::UNAUTHORIZED_REDIRECT_DELAY).await;

    tracing::info!("StudyBeat client shutting down");
    Ok(())
}

fn print_status(session: &SessionStore) {
    if !session.is_logged_in() {
        println!("Not logged in");
        return;
    }

    let name = session
        .user()
        .and_then(|u| u.nickname.clone().or_else(|| u.username.clone()))
        .unwrap_or_else(|| "unknown user".to_string());
    println!("Logged in as {name}");

    if let Some(stats) = session.stats() {
        println!(
            "Study days: {}  practice: {}  tests: {}  average score: {:.1}",
            stats.study_days, stats.practice_count, stats.test_count, stats.average_score
        );
    }
}
