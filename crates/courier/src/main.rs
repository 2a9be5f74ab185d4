//! Courier - fetch a URL from the command line
//!
//! Usage: courier [OPTIONS] <URL>

use std::env;
use std::io;
use std::process::ExitCode;

use courier_http::{Method, RawResponse, Session};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the user asked for
struct Options {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    output: Option<String>,
    charset: Option<String>,
    decompress: bool,
    show_head: bool,
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("courier");

    let options = match parse_args(&args[1.min(args.len())..]) {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_usage(program);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(program);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(options) {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// `Ok(None)` means help or version was printed
fn parse_args(args: &[String]) -> Result<Option<Options>, String> {
    let mut options = Options {
        method: Method::GET,
        url: String::new(),
        headers: Vec::new(),
        output: None,
        charset: None,
        decompress: true,
        show_head: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--help" | "-h" => return Ok(None),
            "--version" | "-V" => {
                println!("Courier {}", VERSION);
                return Ok(None);
            }
            "-X" | "--request" => {
                let method = value(arg)?;
                options.method = Method::from_bytes(method.to_uppercase().as_bytes())
                    .map_err(|_| format!("Invalid method: {}", method))?;
            }
            "-H" | "--header" => {
                let header = value(arg)?;
                let (name, val) = header
                    .split_once(':')
                    .ok_or_else(|| format!("Header must be 'Name: value', got {:?}", header))?;
                options.headers.push((name.trim().to_string(), val.trim().to_string()));
            }
            "-o" | "--output" => options.output = Some(value(arg)?),
            "--charset" => options.charset = Some(value(arg)?),
            "--raw" => options.decompress = false,
            "-i" | "--include" => options.show_head = true,
            "-I" | "--head" => {
                options.method = Method::HEAD;
                options.show_head = true;
            }
            flag if flag.starts_with('-') => return Err(format!("Unknown option: {}", flag)),
            url => options.url = url.to_string(),
        }
    }

    if options.url.is_empty() {
        return Err("Missing URL".to_string());
    }
    Ok(Some(options))
}

fn run(options: Options) -> Result<(), Box<dyn std::error::Error>> {
    let url = if options.url.contains("://") {
        options.url.clone()
    } else {
        format!("https://{}", options.url)
    };

    let session = Session::new()?;
    let headers = options.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()));
    let mut raw = session
        .request(options.method.clone(), url)
        .headers(headers)
        .send()?
        .decompress(options.decompress);
    if let Some(label) = &options.charset {
        raw = raw.charset_label(label)?;
    }

    if options.show_head {
        print_head(&raw);
    }
    if options.method == Method::HEAD {
        raw.close();
        return Ok(());
    }

    match &options.output {
        Some(path) => {
            let response = raw.to_file_response(path)?;
            log::info!("Saved {} to {}", response.url(), response.body().display());
        }
        // Raw bytes go straight through; decoded text when a charset was forced
        None if options.charset.is_none() => {
            raw.write_to(&mut io::stdout().lock())?;
        }
        None => print!("{}", raw.read_to_text()?),
    }
    Ok(())
}

fn print_head(raw: &RawResponse) {
    println!("{}", raw.status_line());
    for header in raw.headers() {
        println!("{}", header);
    }
    println!();
}

fn print_usage(program: &str) {
    println!(
        r#"Courier {} - fetch a URL

USAGE:
    {} [OPTIONS] <URL>

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    -X, --request <METHOD>  HTTP method (default GET)
    -H, --header <H: V>     Add a request header
    -o, --output <PATH>     Write the body to a file
    --charset <LABEL>       Decode the body as text in this charset
    --raw                   Do not decompress the body
    -i, --include           Print the status line and headers
    -I, --head              Send a HEAD request and print the headers

EXAMPLES:
    {} https://example.com
    {} -I https://example.com
    {} -o page.html https://example.com
"#,
        VERSION, program, program, program, program
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_defaults() {
        let options = parse_args(&args(&["example.com"])).unwrap().unwrap();
        assert_eq!(options.method, Method::GET);
        assert_eq!(options.url, "example.com");
        assert!(options.decompress);
    }

    #[test]
    fn test_parse_flags() {
        let options = parse_args(&args(&[
            "-X", "post", "-H", "Accept: text/plain", "--raw", "--charset", "gbk", "-o", "out.bin",
            "http://localhost/",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(options.method, Method::POST);
        assert_eq!(options.headers, vec![("Accept".to_string(), "text/plain".to_string())]);
        assert!(!options.decompress);
        assert_eq!(options.charset.as_deref(), Some("gbk"));
        assert_eq!(options.output.as_deref(), Some("out.bin"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["-H"])).is_err());
        assert!(parse_args(&args(&["-H", "no-colon", "x"])).is_err());
        assert!(parse_args(&args(&["--bogus", "x"])).is_err());
        assert!(parse_args(&args(&["-h"])).unwrap().is_none());
    }
}
