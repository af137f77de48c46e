// UI layer: one function per command. Each takes the already-opened
// config store, talks to `api` when it has to, and prints the result.
//
// Human-readable output goes to stdout; the spinner and its status line go
// to stderr so that `--json` output can be piped straight into other tools.

use crate::api::{
    lookup_batch, BarcodeLookup, BatchResult, LookupClient, LookupError, BASE_URL,
};
use crate::config::{mask_key, ConfigStore, API_KEY};
use crate::product::{format_product, NormalizedProduct, SpecEntry, MISSING};
use anyhow::{Context, Result};
use crossterm::style::{Color, Stylize};
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const CARD_WIDTH: usize = 56;
const CODE_COL: usize = 18;
const NAME_COL: usize = 32;
const BRAND_COL: usize = 24;
const ERROR_PREVIEW: usize = 28;
const DESCRIPTION_LIMIT: usize = 120;
const ORANGE: Color = Color::Rgb {
    r: 255,
    g: 165,
    b: 0,
};

/// `config set`: store the API key given on the command line, or read it
/// from a hidden prompt when `prompt` is set.
pub fn config_set(
    store: &mut ConfigStore,
    api_key: Option<String>,
    prompt: bool,
) -> Result<ExitCode> {
    let key = match (api_key, prompt) {
        (Some(key), _) => key,
        (None, true) => Password::new()
            .with_prompt("Go-UPC API key")
            .interact()
            .context("Failed to read API key from terminal")?,
        (None, false) => {
            eprintln!("{}", "Error: --api-key is required.".red());
            eprintln!("{}", "Usage: goupc config set --api-key <YOUR_KEY>".yellow());
            return Ok(ExitCode::FAILURE);
        }
    };

    let key = key.trim();
    if key.is_empty() {
        eprintln!("{}", "Error: API key must not be empty.".red());
        return Ok(ExitCode::FAILURE);
    }

    store.set(API_KEY, key).context("Failed to save API key")?;
    tracing::info!(path = %store.path().display(), "API key saved");
    println!("{}", "✔ API key saved.".green());
    println!(
        "{}{}",
        "Config stored at: ".grey(),
        store.path().display().to_string().cyan()
    );
    Ok(ExitCode::SUCCESS)
}

/// `config show`: masked key plus configured status.
pub fn config_show(store: &ConfigStore) -> ExitCode {
    println!("{}", "\nCurrent Configuration\n".bold());

    if store.is_configured() {
        println!("{}{}", "  API Key: ".cyan(), mask_key(store.api_key()).white());
        println!("{}{}", "\n  Status: ".green(), "Configured".bold().green());
    } else {
        println!("{}{}", "  API Key: ".cyan(), "(not set)".grey());
        println!("{}{}", "\n  Status: ".red(), "Not configured".bold().red());
        println!("{}", "\n  Run: goupc config set --api-key <YOUR_KEY>".yellow());
    }
    println!();
    ExitCode::SUCCESS
}

/// `config clear`: forget every stored value.
pub fn config_clear(store: &mut ConfigStore) -> Result<ExitCode> {
    store.clear().context("Failed to clear configuration")?;
    println!("{}", "Configuration cleared.".yellow());
    Ok(ExitCode::SUCCESS)
}

/// Result of a command that talks to the API, before it becomes a process
/// exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::FAILURE,
        }
    }
}

/// `lookup <code>`: a single lookup, printed as a product card or raw JSON.
pub fn lookup(store: &ConfigStore, code: &str, json: bool) -> Result<ExitCode> {
    if !require_auth(store) {
        return Ok(ExitCode::FAILURE);
    }
    let client = match LookupClient::new(store.api_key()) {
        Ok(client) => client,
        Err(err) => {
            report_failure("Lookup failed", &err);
            return Ok(ExitCode::FAILURE);
        }
    };
    let outcome = lookup_with(&client, code, json, &mut io::stdout().lock())?;
    Ok(outcome.into())
}

/// Run one lookup through `client` and write the result to `out`.
/// A failed lookup is reported on stderr and yields [`Outcome::Failure`].
pub fn lookup_with<L, W>(client: &L, code: &str, json: bool, out: &mut W) -> Result<Outcome>
where
    L: BarcodeLookup + ?Sized,
    W: Write,
{
    let spinner = spinner(format!("Looking up barcode {}...", code.cyan()));
    let outcome = client.lookup(code);
    spinner.finish_and_clear();

    let data = match outcome {
        Ok(data) => data,
        Err(err) => {
            report_failure("Lookup failed", &err);
            return Ok(Outcome::Failure);
        }
    };
    eprintln!("{} {}", "✔".green(), "Product found!".green());

    if json {
        write_json(out, &data)?;
    } else {
        write_product(out, &format_product(&data), code)?;
    }
    Ok(Outcome::Success)
}

/// `batch <code...>`: look up every code in turn and print a summary table
/// or the raw results. Failed items never change the exit code.
pub fn batch(store: &ConfigStore, codes: &[String], json: bool) -> Result<ExitCode> {
    if !require_auth(store) {
        return Ok(ExitCode::FAILURE);
    }
    let client = match LookupClient::new(store.api_key()) {
        Ok(client) => client,
        Err(err) => {
            report_failure("Batch lookup failed", &err);
            return Ok(ExitCode::FAILURE);
        }
    };
    let outcome = batch_with(&client, codes, json, &mut io::stdout().lock())?;
    Ok(outcome.into())
}

/// Run a batch through `client` and write the table or JSON array to `out`.
pub fn batch_with<L, W>(client: &L, codes: &[String], json: bool, out: &mut W) -> Result<Outcome>
where
    L: BarcodeLookup + ?Sized,
    W: Write,
{
    let spinner = spinner(format!("Looking up {} barcode(s)...", codes.len()));
    let results = lookup_batch(client, codes);
    spinner.finish_and_clear();
    eprintln!(
        "{} {}",
        "✔".green(),
        format!("Done. {} result(s).", results.len()).green()
    );

    if json {
        write_json(out, &results)?;
    } else {
        write_batch_table(out, &results)?;
    }
    Ok(Outcome::Success)
}

fn report_failure(title: &str, err: &LookupError) {
    eprintln!("{} {}", "✖".red(), title.red());
    eprintln!("{}", format!("\n{err}").red());
}

/// `info`: static API details, current status and usage examples. Makes no
/// network call.
pub fn info(store: &ConfigStore) -> ExitCode {
    let configured = store.is_configured();
    let masked = if configured {
        mask_key(store.api_key())
    } else {
        "(not set)".to_string()
    };

    println!(
        "{}{}",
        "\nGo-UPC Barcode Lookup CLI".bold(),
        format!(" - goupc v{}", env!("CARGO_PKG_VERSION")).grey()
    );
    println!("{}", "─".repeat(CARD_WIDTH).grey());

    println!("{}", "\nAPI Details".bold());
    println!("{}Go-UPC (https://go-upc.com)", "  Provider : ".cyan());
    println!("{}{}", "  Base URL : ".cyan(), BASE_URL);
    println!("{}Bearer token (Authorization header)", "  Auth     : ".cyan());
    println!("{}GET /code/{{barcode}}", "  Endpoint : ".cyan());

    println!("{}", "\nStatus".bold());
    let mark = if configured { " ✔".green() } else { " ✗".red() };
    println!("{}{}{}", "  API Key  : ".cyan(), masked, mark);
    let ready = if configured {
        "Yes".bold().green()
    } else {
        "No - run: goupc config set --api-key <KEY>".bold().red()
    };
    println!("{}{}", "  Ready    : ".cyan(), ready);

    println!("{}", "\nUsage Examples".bold());
    let examples = [
        ("Set your API key", "goupc config set --api-key sk-abc123"),
        ("Look up a single UPC", "goupc lookup 012345678905"),
        ("Look up an EAN", "goupc lookup 5901234123457"),
        ("Look up an ISBN", "goupc lookup 9780262046305"),
        (
            "Batch lookup (space-separated)",
            "goupc batch 012345678905 5901234123457 9780262046305",
        ),
        ("Get JSON output", "goupc lookup 012345678905 --json"),
        ("Show stored config", "goupc config show"),
    ];
    for (i, (label, command)) in examples.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", format!("  # {label}").grey());
        println!("{}", format!("  {command}").cyan());
    }

    println!("{}", "\nTips".bold());
    for tip in [
        "UPC codes are 12 digits (North America)",
        "EAN codes are 13 digits (international)",
        "ISBN-13 codes work directly as barcodes",
        "Use --json for scripting and piping to jq",
        "Rate limits depend on your Go-UPC plan",
    ] {
        println!("{}", format!("  • {tip}").grey());
    }

    println!("{}", "\n  Docs   : https://go-upc.com/docs".grey());
    println!(
        "{}",
        "  Issues : https://github.com/ktmcp-cli/goupc/issues\n".grey()
    );
    ExitCode::SUCCESS
}

/// Print setup instructions and return false when no API key is stored.
fn require_auth(store: &ConfigStore) -> bool {
    if store.is_configured() {
        return true;
    }
    eprintln!("{}", "Error: No API key configured.\n".red());
    eprintln!(
        "{}{}",
        "Run: ".yellow(),
        "goupc config set --api-key <YOUR_API_KEY>".cyan()
    );
    eprintln!(
        "{}{}",
        "\nGet your key at: ".yellow(),
        "https://go-upc.com".underlined()
    );
    false
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.yellow} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode JSON output")?;
    writeln!(out, "{text}")?;
    Ok(())
}

/// Render one product as a card.
pub fn write_product<W: Write>(
    out: &mut W,
    product: &NormalizedProduct,
    code: &str,
) -> Result<()> {
    let divider = "─".repeat(CARD_WIDTH).grey();

    writeln!(out, "{divider}")?;
    writeln!(out, "{}", format!("  {}", product.name).bold().with(ORANGE))?;
    writeln!(out, "{divider}")?;
    writeln!(out, "{}{}", "  Barcode  ".cyan(), code.white())?;
    if product.barcode_type != MISSING {
        let kind = product.barcode_type.as_str();
        writeln!(out, "{}{}", "  Type     ".cyan(), kind.white())?;
    }
    writeln!(out, "{}{}", "  Brand    ".cyan(), product.brand.as_str().white())?;
    writeln!(out, "{}{}", "  Category ".cyan(), product.category.as_str().white())?;

    if product.description != MISSING {
        writeln!(
            out,
            "{}{}",
            "  Desc     ".cyan(),
            shorten_description(&product.description).white()
        )?;
    }

    if product.image_url != MISSING {
        writeln!(
            out,
            "{}{}",
            "  Image    ".cyan(),
            product.image_url.as_str().underlined().blue()
        )?;
    }

    if !product.specs.is_empty() {
        writeln!(out, "{}", "\n  Specs:".cyan())?;
        for spec in &product.specs {
            match spec {
                SpecEntry::Text(text) => {
                    writeln!(out, "{}{}", "    • ".grey(), text.as_str().white())?;
                }
                SpecEntry::Pair { key, value } => writeln!(
                    out,
                    "{}{}",
                    format!("    • {key}: ").grey(),
                    value.as_str().white()
                )?,
            }
        }
    }

    writeln!(out, "{divider}")?;
    Ok(())
}

fn write_batch_table<W: Write>(out: &mut W, results: &[BatchResult]) -> Result<()> {
    let divider = "─".repeat(CODE_COL + NAME_COL + BRAND_COL + 6).grey();

    writeln!(out, "{divider}")?;
    writeln!(
        out,
        "{}{}{}",
        pad_right("Code", CODE_COL).bold().cyan(),
        pad_right("Name", NAME_COL).bold().cyan(),
        pad_right("Brand", BRAND_COL).bold().cyan()
    )?;
    writeln!(out, "{divider}")?;

    for result in results {
        let [code, name, brand] = batch_cells(result);
        if result.is_success() {
            writeln!(out, "{}{}{}", code.white(), name.white(), brand.white())?;
        } else {
            writeln!(out, "{}{}{}", code.grey(), name.red(), brand.grey())?;
        }
    }

    writeln!(out, "{divider}")?;

    let found = results.iter().filter(|r| r.is_success()).count();
    let failed = results.len() - found;
    let failed_text = if failed > 0 {
        format!("  Failed: {failed}").red().to_string()
    } else {
        String::new()
    };
    writeln!(out, "{}{}\n", format!("\n  Found: {found}").green(), failed_text)?;
    Ok(())
}

/// Padded table cells (code, name, brand) for one batch row.
fn batch_cells(result: &BatchResult) -> [String; 3] {
    match result {
        BatchResult::Success { code, data } => {
            let product = format_product(data);
            [
                pad_right(code, CODE_COL),
                pad_right(&truncate(&product.name, NAME_COL - 2), NAME_COL),
                pad_right(&truncate(&product.brand, BRAND_COL - 2), BRAND_COL),
            ]
        }
        BatchResult::Failure { code, error } => [
            pad_right(code, CODE_COL),
            pad_right(&format!("Error: {}", take_width(error, ERROR_PREVIEW)), NAME_COL),
            pad_right("—", BRAND_COL),
        ],
    }
}

fn shorten_description(text: &str) -> String {
    if text.width() > DESCRIPTION_LIMIT {
        format!("{}...", take_width(text, DESCRIPTION_LIMIT - 3))
    } else {
        text.to_string()
    }
}

/// Longest prefix of `text` that fits in `max` terminal columns.
fn take_width(text: &str, max: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in text.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max {
            break;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

/// Pad with spaces, or cut, to exactly `width` columns.
fn pad_right(text: &str, width: usize) -> String {
    let cut = take_width(text, width);
    let padding = width.saturating_sub(cut.width());
    format!("{cut}{}", " ".repeat(padding))
}

/// Shorten to at most `max` columns, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.width() > max {
        format!("{}…", take_width(text, max.saturating_sub(1)))
    } else {
        text.to_string()
    }
}
