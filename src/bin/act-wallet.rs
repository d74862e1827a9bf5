// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Interactive ACT wallet.
//!
//! Reads one command per line from stdin. Logs go to stderr and are
//! controlled by `RUST_LOG`.

use std::time::Duration;

use act_wallet::{
    ActEngine, ActParams, Credits, DEFAULT_ISSUER, HttpConfig, HttpTransport, IssuerReply,
    IssuerRequest, IssuerUrl, LocalIssuer, ProtocolEngine, Transport, TransportError,
};
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Anonymous Credit Tokens wallet.
#[derive(Parser, Debug)]
#[command(name = "act-wallet", about = "Anonymous Credit Tokens wallet", version)]
struct Cli {
    /// Issuer base URL. Endpoints are resolved relative to it.
    #[arg(long, env = "ACT_ISSUER_URL", default_value = DEFAULT_ISSUER)]
    issuer: String,

    /// Per-request timeout in seconds. No timeout when unset.
    #[arg(long, env = "ACT_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Talk to an issuer running in this process instead of over HTTP.
    #[arg(long)]
    local: bool,
}

enum Backend {
    Http(HttpTransport),
    Local(LocalIssuer),
}

#[async_trait]
impl Transport for Backend {
    async fn round_trip(&self, request: IssuerRequest) -> Result<IssuerReply, TransportError> {
        match self {
            Backend::Http(http) => http.round_trip(request).await,
            Backend::Local(local) => local.round_trip(request).await,
        }
    }
}

type Wallet = ProtocolEngine<ActEngine, Backend>;

const HELP: &str = "\
commands:
  request <n>     obtain n credits (1-255), replacing the current token
  spend <n>       spend n credits (1-255)
  balance         show the balance and token fingerprint
  issuer [url]    show or change the issuer
  last            show the last transaction
  restart         forget the token, the key and the balance
  help            show this text
  quit            leave";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let labels = ActParams::default();
    let backend = if cli.local {
        Backend::Local(LocalIssuer::new(&labels))
    } else {
        let mut config = HttpConfig::new(IssuerUrl::from_input(&cli.issuer)?);
        if let Some(secs) = cli.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Backend::Http(HttpTransport::new(config)?)
    };
    let mut wallet = ProtocolEngine::new(ActEngine::new(labels), backend);
    info!(local = cli.local, "wallet started");

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let argument = words.collect::<Vec<_>>().join(" ");

        match command {
            "request" => request(&mut wallet, &argument).await,
            "spend" => spend(&mut wallet, &argument).await,
            "balance" => show_balance(&wallet),
            "issuer" => issuer(&mut wallet, &argument),
            "last" => match wallet.last_transaction() {
                Some(record) => println!("{:?} {}: {}", record.kind, record.credits, record.message),
                None => println!("no transaction yet"),
            },
            "restart" => {
                wallet.restart();
                println!("wallet reset");
            }
            "help" => println!("{HELP}"),
            "quit" | "exit" => break,
            other => println!("unknown command {other:?}, try help"),
        }
    }
    Ok(())
}

async fn request(wallet: &mut Wallet, amount: &str) {
    match wallet.issue(amount).await {
        Ok(receipt) => println!("received {} credits, balance {}", receipt.credits, receipt.balance),
        Err(e) => report(&e),
    }
}

async fn spend(wallet: &mut Wallet, amount: &str) {
    if let Ok(credits) = amount.parse::<Credits>() {
        if wallet.would_overspend(credits) {
            println!(
                "warning: spending {credits} with a balance of {}; the issuer will decide",
                wallet.balance()
            );
        }
    }
    match wallet.spend(amount).await {
        Ok(receipt) => println!("spent {} credits, balance {}", receipt.spent, receipt.balance),
        Err(e) => report(&e),
    }
}

fn show_balance(wallet: &Wallet) {
    let state = wallet.state();
    match state.token() {
        Some(token) => println!("balance {} (token {})", state.balance(), token.fingerprint()),
        None => println!("balance {} (no token)", state.balance()),
    }
}

fn issuer(wallet: &mut Wallet, argument: &str) {
    let Backend::Http(http) = wallet.transport_mut() else {
        println!("issuer: local");
        return;
    };
    if argument.is_empty() {
        println!("issuer: {}", http.issuer());
        return;
    }
    match IssuerUrl::parse(argument) {
        Ok(url) => {
            http.set_issuer(url);
            println!("issuer: {}", http.issuer());
        }
        Err(e) => println!("error: {e}"),
    }
}

fn report(e: &act_wallet::WalletError) {
    let hint = if e.is_retryable() { " (retrying may help)" } else { "" };
    println!("error [{}]: {e}{hint}", e.kind());
}
