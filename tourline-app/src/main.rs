use anyhow::{bail, Context};
use serde::Serialize;
use tourline_app::{telemetry, AppError, AppState};
use tourline_core::payment::PaymentDetails;
use tourline_order::CreateReservationRequest;
use uuid::Uuid;

const USAGE: &str = "usage: tourline-app <quote|create> <request.json>\n       tourline-app charge <reservation-id> <payment.json>\n       tourline-app get <reservation-id>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    let config = tourline_store::app_config::Config::load().context("Failed to load config")?;
    let state = AppState::bootstrap(&config).await?;
    let api = &state.api;

    match (command.as_str(), &args[1..]) {
        ("quote", [path]) => {
            let request: CreateReservationRequest = read_json(path)?;
            print(api.quote(&request).await)
        }
        ("create", [path]) => {
            let request: CreateReservationRequest = read_json(path)?;
            print(api.create_reservation(request).await)
        }
        ("charge", [id, path]) => {
            let id = Uuid::parse_str(id).context("Invalid reservation id")?;
            let details: PaymentDetails = read_json(path)?;
            print(api.charge_reservation(id, details).await)
        }
        ("get", [id]) => {
            let id = Uuid::parse_str(id).context("Invalid reservation id")?;
            print(api.get_reservation(id).await)
        }
        _ => bail!(USAGE),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Malformed JSON in {}", path))
}

fn print<T: Serialize>(result: Result<T, AppError>) -> anyhow::Result<()> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            let body = serde_json::json!({ "error": e.to_string(), "code": e.code() });
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(match e {
                AppError::Validation(_) => 2,
                AppError::NotFound(_) => 3,
                AppError::Internal(_) => 1,
            });
        }
    }
}
