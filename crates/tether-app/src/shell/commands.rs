//! Console commands read from stdin.

use tether_bridge::{Bridge, Response};
use tether_common::{ApiRequest, BridgeError};

pub const HELP: &str = "\
commands:
  get <endpoint>            GET query, e.g. `get version`
  post <endpoint> [body]    POST query, e.g. `post delay 500`
  online <on|off>           tell the engine about connectivity
  uri <uri>                 hand a URI to the engine
  reconnect                 ask the engine to reconnect
  mobile                    mobile data setting changed
  log <message>             send a log line to the engine
  help                      this text
  quit                      shut down";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Query(ApiRequest),
    Online(bool),
    Uri(String),
    Reconnect,
    MobileData,
    Log(String),
    Help,
    Quit,
    Empty,
}

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "get" => {
            if rest.is_empty() {
                return Err("usage: get <endpoint>".into());
            }
            Ok(Command::Query(ApiRequest::get(rest)))
        }
        "post" => {
            let (endpoint, body) = match rest.split_once(char::is_whitespace) {
                Some((endpoint, body)) => (endpoint, body.trim()),
                None => (rest, ""),
            };
            if endpoint.is_empty() {
                return Err("usage: post <endpoint> [body]".into());
            }
            Ok(Command::Query(ApiRequest::post(endpoint, body)))
        }
        "online" => match rest {
            "on" | "true" | "1" => Ok(Command::Online(true)),
            "off" | "false" | "0" => Ok(Command::Online(false)),
            _ => Err("usage: online <on|off>".into()),
        },
        "uri" if !rest.is_empty() => Ok(Command::Uri(rest.to_string())),
        "uri" => Err("usage: uri <uri>".into()),
        "reconnect" => Ok(Command::Reconnect),
        "mobile" => Ok(Command::MobileData),
        "log" => Ok(Command::Log(rest.to_string())),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}' (try `help`)")),
    }
}

fn print_response(response: Response) {
    println!("[{}] {}", response.id, response.payload);
}

/// Run a command against the bridge. `Quit` is the caller's business.
pub fn execute(bridge: &Bridge, command: Command) -> Result<(), BridgeError> {
    match command {
        Command::Query(request) => {
            let id = bridge.dispatch_with(&request.to_json(), print_response)?;
            println!("[{id}] sent {:?} {}", request.method, request.path());
        }
        Command::Online(online) => bridge.set_online(online)?,
        Command::Uri(uri) => bridge.handle_uri(&uri)?,
        Command::Reconnect => bridge.manual_reconnect()?,
        Command::MobileData => bridge.using_mobile_data_changed()?,
        Command::Log(message) => bridge.log_to_engine(&message)?,
        Command::Help => println!("{HELP}"),
        Command::Quit | Command::Empty => {}
    }
    Ok(())
}
