use std::{env, sync::Arc, thread::spawn};

use anyhow::Result;
use form_params::{Options, Params, Parser, Value};
use http::{HeaderMap, HeaderName, HeaderValue};
use tiny_http::{Request, Response, Server, StatusCode};

fn headers(request: &Request) -> HeaderMap {
    let mut map = HeaderMap::new();
    for h in request.headers() {
        let name = HeaderName::from_bytes(h.field.as_str().as_str().as_bytes());
        let value = HeaderValue::from_bytes(h.value.as_str().as_bytes());
        if let (Ok(name), Ok(value)) = (name, value) {
            map.append(name, value);
        }
    }
    map
}

fn summary(prefix: &str, params: &Params, txt: &mut String) {
    for (key, value) in params {
        let key = if prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{prefix}[{key}]")
        };

        match value {
            Value::Text(text) => {
                tracing::info!("text {} {}", key, text.len());
                txt.push_str(&format!("text {} {}\r\n", key, text.len()));
            }
            Value::File(file) => {
                tracing::info!("file {} {} {}", key, file.filename, file.size);
                txt.push_str(&format!("file {} {} {}\r\n", key, file.filename, file.size));
            }
            Value::Node(node) => summary(&key, node, txt),
        }
    }
}

fn hello(parser: &Parser, request: &mut Request) -> Result<Response<std::io::Cursor<Vec<u8>>>> {
    let headers = headers(request);

    let Some(params) = parser.parse(&headers, request.as_reader())? else {
        return Ok(
            Response::from_string("not multipart/form-data\r\n").with_status_code(StatusCode(415))
        );
    };

    let mut txt = String::new();
    summary("", &params, &mut txt);

    // temp files are removed with `params`
    Ok(Response::from_string(txt))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        // From env var: `RUST_LOG`
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    let mut arg = env::args()
        .find(|a| a.starts_with("--size="))
        .unwrap_or_else(|| "--size=8".to_string());

    let size = arg.split_off(7).parse::<usize>().unwrap_or(8) * 1024;
    let parser = Arc::new(Parser::new(Options::default().buffer_size(size)));
    let server = Server::http("0.0.0.0:3000").map_err(|e| anyhow::anyhow!(e))?;
    println!("Now listening on port 3000");

    for mut request in server.incoming_requests() {
        let parser = parser.clone();
        spawn(move || {
            let response = match hello(&parser, &mut request) {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("{}", e);
                    Response::from_string(format!("{e}\r\n")).with_status_code(StatusCode(400))
                }
            };
            let _ = request.respond(response);
        });
    }

    Ok(())
}
