pub mod chat;
pub mod cli;
pub mod config;
pub mod data;
pub mod http;
pub mod intent;
pub mod llm;
pub mod trace;

use anyhow::{Result, anyhow};
use chat::ChatController;
use cli::{AppState, CliArgs, run_app};
use config::AppConfig;
use data::Datasets;
use http::client::HttpClient;
use llm::credentials::CredentialSource;
use llm::{BedrockProvider, ModelGateway};
use std::time::{SystemTime, UNIX_EPOCH};
use trace::SessionTrace;

pub async fn run(args: CliArgs) -> Result<()> {
    let config = AppConfig::load_with_path(args.config.as_deref())?;
    // Bad data stops the program before the terminal switches screens.
    let datasets = Datasets::load(&config.data_dir)
        .map_err(|err| anyhow!("Erro ao carregar os dados: {err}"))?;

    let session_id = generate_session_id();
    let trace = SessionTrace::create(&session_id)?;
    trace.log_info(&format!(
        "loaded {} students and {} courses from {}",
        datasets.students.records().len(),
        datasets.courses.records().len(),
        config.data_dir.display()
    ));

    let http = HttpClient::new(reqwest::Client::new()).with_trace(trace.clone());
    let provider = BedrockProvider::new(
        http,
        CredentialSource::profile(config.aws_profile.clone()),
        config.aws_region.clone(),
        config.bedrock_model.clone(),
        config.bedrock_endpoint.clone(),
    );
    let gateway = ModelGateway::new(provider).with_trace(trace.clone());
    let controller = ChatController::new(datasets, gateway).with_trace(trace.clone());

    let mut app_state = AppState::new(session_id, controller, config.theme.clone(), trace);
    run_app(&mut app_state).await
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::generate_session_id;

    #[test]
    fn generated_session_id_has_expected_shape() {
        let session_id = generate_session_id();
        let mut parts = session_id.split('-');
        let ts = parts.next().expect("timestamp segment");
        let pid = parts.next().expect("pid segment");
        assert!(
            parts.next().is_none(),
            "session id should contain one delimiter"
        );
        assert!(!ts.is_empty(), "timestamp segment should not be empty");
        assert!(
            ts.chars().all(|ch| ch.is_ascii_hexdigit()),
            "timestamp segment should be hex"
        );
        assert!(
            pid.chars().all(|ch| ch.is_ascii_hexdigit()),
            "pid segment should be hex"
        );
    }
}
