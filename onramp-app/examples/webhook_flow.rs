//! End-to-end deposit flow against a locally started server.
//!
//! Run with: cargo run -p onramp-app --example webhook_flow --no-default-features --features sqlite

use onramp_client::OnRampClient;
use onramp_hex::{
    OnRampService,
    inbound::{HttpServer, ServerSettings},
};
use onramp_repo::build_repo;
use std::net::SocketAddr;
use tempfile::tempdir;
use tokio::net::TcpListener;

const ADMIN_KEY: &str = "adm_example";
const SECRET: &str = "whsec_example";

fn rupees(paise: i64) -> String {
    format!("₹{}.{:02}", paise / 100, paise % 100)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Bind once and hand the listener to the server
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("onramp.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("🚀 Starting server on {addr}...");
    println!("   Database: {db_url}");

    let repo = build_repo(&db_url).await?;
    let server = HttpServer::new(
        OnRampService::new(repo),
        ServerSettings {
            webhook_secret: Some(SECRET.to_string()),
            admin_api_key: Some(ADMIN_KEY.to_string()),
            ..ServerSettings::default()
        },
    );
    let router = server.router();

    tokio::spawn(async move {
        let app = router.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server stopped: {e}");
        }
    });

    let base_url = format!("http://{addr}");
    let bank = OnRampClient::new(&base_url).with_webhook_secret(SECRET);
    let admin = OnRampClient::new(&base_url).with_admin_key(ADMIN_KEY);

    println!("✅ Server health: {}", admin.health().await?);

    // An unsigned notification is refused
    let unsigned = OnRampClient::new(&base_url).notify("abc", "u1", 100).await;
    assert!(unsigned.is_err());
    println!("✅ Unsigned webhook rejected: {}", unsigned.unwrap_err());

    let tx = admin.initiate("u1", 50_000, None).await?;
    println!("✅ Initiated deposit {} for {}", tx.token, rupees(tx.amount));

    // The bank delivers the same confirmation three times
    for attempt in 1..=3 {
        let ack = bank.notify(&tx.token, "u1", tx.amount).await?;
        let balance = admin.get_balance("u1").await?;
        println!(
            "   delivery #{attempt}: {} → balance {}",
            ack.message,
            rupees(balance.amount)
        );
    }

    let tx = admin.get_onramp(&tx.token).await?;
    println!("✅ Deposit status: {}", tx.status);

    let stale = admin.initiate("u1", 1_000, None).await?;
    admin.fail_onramp(&stale.token).await?;
    bank.notify(&stale.token, "u1", stale.amount).await?;
    let balance = admin.get_balance("u1").await?;
    println!(
        "✅ Late confirmation for failed deposit ignored, balance {}",
        rupees(balance.amount)
    );

    println!("\n🎉 Example completed successfully!");

    Ok(())
}
