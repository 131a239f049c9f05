//! Interactive console that feeds stdin lines through the local gateway.
//!
//! Reads one line per prompt, posts it to the gateway as a regular inbound
//! message, and prints the fulfillment text of the reply. Typing `exit` ends
//! the loop, which the runtime treats as a shutdown request.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

pub struct ConsoleOptions {
    pub gateway_url: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
struct ConsoleReply {
    #[serde(default)]
    text: String,
}

pub async fn run(options: ConsoleOptions) {
    let client = Client::new();
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    info!(
        event_name = "console.started",
        gateway_url = %options.gateway_url,
        session_id = %options.session_id,
        "console loop started"
    );

    println!("Parley console");
    println!("---------------------");

    loop {
        if stdout.write_all(b"-> ").await.is_err() || stdout.flush().await.is_err() {
            break;
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(read_error) => {
                warn!(error = %read_error, "console read failed");
                break;
            }
        };

        let text = line.trim_end_matches(['\r', '\n']).to_owned();
        if text == "exit" {
            println!("Exiting");
            break;
        }
        if text.is_empty() {
            continue;
        }

        let body = json!({ "message": text, "session": options.session_id });
        match client.post(&options.gateway_url).json(&body).send().await {
            Ok(response) => match response.json::<ConsoleReply>().await {
                Ok(reply) => println!("{}", reply.text),
                Err(decode_error) => {
                    warn!(error = %decode_error, "console reply could not be decoded");
                }
            },
            Err(request_error) => {
                warn!(error = %request_error, "console request failed");
            }
        }
    }

    info!(event_name = "console.stopped", "console loop finished");
}
