use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::debug;

use protogo::codegen;
use protogo::descriptor::CodeGeneratorRequest;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut input: Option<String> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut parameter: Option<String> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" => {
                i += 1;
                let Some(dir) = args.get(i) else {
                    bail!("-o needs a directory argument");
                };
                out_dir = Some(PathBuf::from(dir));
            }
            "-p" => {
                i += 1;
                let Some(p) = args.get(i) else {
                    bail!("-p needs a parameter string");
                };
                parameter = Some(p.clone());
            }
            arg if input.is_none() => input = Some(arg.to_string()),
            arg => bail!("unexpected argument {arg}"),
        }
        i += 1;
    }
    let Some(input) = input else {
        print_usage(&args[0]);
        return Ok(());
    };

    // Read the request
    let bytes = if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).context("reading stdin")?;
        buf
    } else {
        fs::read(&input).with_context(|| format!("reading {input}"))?
    };
    let mut request: CodeGeneratorRequest =
        serde_json::from_slice(&bytes).context("parsing request")?;
    if let Some(p) = parameter {
        request.parameter = Some(p);
    }
    debug!(
        "request carries {} files, {} to generate",
        request.proto_file.len(),
        request.file_to_generate.len()
    );

    let response = codegen::generate(request)?;

    // Write output
    match out_dir {
        Some(dir) => {
            for f in &response.file {
                let Some(name) = f.name.as_deref() else {
                    bail!("response file without a name");
                };
                let path = dir.join(name);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                fs::write(&path, f.content.as_deref().unwrap_or_default())
                    .with_context(|| format!("writing {}", path.display()))?;
                eprintln!("Generated {}", path.display());
            }
        }
        None => {
            let out = serde_json::to_string_pretty(&response)?;
            io::stdout().write_all(out.as_bytes())?;
            io::stdout().write_all(b"\n")?;
        }
    }

    Ok(())
}

fn print_usage(program: &str) {
    eprintln!("Go Binding Generator");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  {program} <request.json> [-o OUT_DIR] [-p PARAMETER]");
    eprintln!("  {program} - [-o OUT_DIR] < request.json");
    eprintln!();
    eprintln!("ARGUMENTS:");
    eprintln!("  request.json    JSON CodeGeneratorRequest (- reads stdin)");
    eprintln!("  -o OUT_DIR      Unpack the generated files under OUT_DIR");
    eprintln!("                  (default: JSON response on stdout)");
    eprintln!("  -p PARAMETER    Override the request's parameter string");
    eprintln!();
    eprintln!("EXAMPLE:");
    eprintln!("  {program} request.json -o out/");
}
