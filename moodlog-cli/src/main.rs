//! moodlog: terminal client for the Moodlog HTTP API
//!
//! # Subcommands
//! - `write [TEXT...] [--title T]`: analyze and store an entry (stdin when TEXT is omitted)
//! - `list [--mood M] [--tag T] [-q Q] [--json]`: timeline, newest first
//! - `stats`: mood distribution and top tags
//! - `analyze [TEXT...]`: analyze without storing
//! - `status`: show server health

use std::io::Read;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
const DEFAULT_OWNER: &str = "local";
const PREVIEW_CHARS: usize = 80;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "moodlog", version, about = "Mood-tagged journaling from the terminal")]
struct Cli {
    /// Moodlog HTTP server URL (overrides MOODLOG_HTTP_URL env var)
    #[arg(long, env = "MOODLOG_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Journal owner
    #[arg(long, env = "MOODLOG_OWNER", default_value = DEFAULT_OWNER)]
    owner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a journal entry
    Write {
        /// Entry text; read from stdin when omitted
        text: Vec<String>,

        #[arg(short, long)]
        title: Option<String>,

        /// Print the stored entry as JSON
        #[arg(long)]
        json: bool,
    },

    /// List entries, newest first
    List {
        #[arg(long)]
        mood: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        /// Substring search over text, title and summary
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show mood statistics
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Analyze text without storing it
    Analyze {
        text: Vec<String>,

        #[arg(short, long)]
        title: Option<String>,
    },

    /// Show Moodlog server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct Entry {
    pub id: String,
    pub title: Option<String>,
    pub raw_text: String,
    pub mood: String,
    pub mood_score: Option<f64>,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct EntriesResponse {
    pub entries: Vec<Entry>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct Analysis {
    pub mood: String,
    pub summary: String,
    #[serde(rename = "moodScore")]
    pub mood_score: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub by_mood: serde_json::Map<String, serde_json::Value>,
    pub average_score: Option<f64>,
    pub dominant_mood: Option<String>,
    pub top_tags: Vec<TagCount>,
}

// ============================================================================
// Formatting
// ============================================================================

/// Join positional words; fall back to stdin when none were given.
pub fn entry_text(words: &[String], stdin: impl Read) -> anyhow::Result<String> {
    let text = if words.is_empty() {
        std::io::read_to_string(stdin).context("failed to read entry from stdin")?
    } else {
        words.join(" ")
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        bail!("journal entry text is required");
    }
    Ok(text)
}

/// Score as a percentage, or "-" when absent.
pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{:.0}%", s * 100.0),
        None => "-".to_string(),
    }
}

/// First line of text, capped at `max` characters.
pub fn preview(text: &str, max: usize) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max).collect();
        format!("{}...", cut.trim_end())
    } else {
        line.to_string()
    }
}

/// Date part of an RFC 3339 timestamp.
pub fn short_date(ts: &str) -> &str {
    ts.get(..10).unwrap_or(ts)
}

pub fn format_entry_line(e: &Entry) -> String {
    let tags = if e.tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", e.tags.join(", "))
    };
    let heading = match e.title.as_deref() {
        Some(t) if !t.trim().is_empty() => format!("{}: ", t.trim()),
        _ => String::new(),
    };
    format!(
        "{}  {:<10} {:>4}  {}{}{}",
        short_date(&e.created_at),
        e.mood,
        format_score(e.mood_score),
        heading,
        preview(&e.raw_text, PREVIEW_CHARS),
        tags
    )
}

pub fn format_stats(s: &Stats) -> String {
    let mut out = format!("Entries:        {}\n", s.total);
    out.push_str(&format!(
        "Dominant mood:  {}\n",
        s.dominant_mood.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!(
        "Average score:  {}\n",
        format_score(s.average_score)
    ));

    if !s.by_mood.is_empty() {
        out.push_str("\nBy mood:\n");
        for (mood, count) in &s.by_mood {
            out.push_str(&format!("  {:<10} {}\n", mood, count));
        }
    }
    if !s.top_tags.is_empty() {
        out.push_str("\nTop tags:\n");
        for t in &s.top_tags {
            out.push_str(&format!("  {:<14} {}\n", t.tag, t.count));
        }
    }
    out
}

fn print_analysis(a: &Analysis) {
    println!("Mood:     {} ({})", a.mood, format_score(a.mood_score));
    println!("Summary:  {}", a.summary);
    if !a.tags.is_empty() {
        println!("Tags:     {}", a.tags.join(", "));
    }
    println!("Source:   {}", a.source);
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Fail with the server's error message on a non-success status.
fn check(resp: reqwest::blocking::Response) -> anyhow::Result<reqwest::blocking::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body: serde_json::Value = resp.json().unwrap_or_default();
    let msg = body["error"].as_str().unwrap_or("no error message");
    bail!("server returned {}: {}", status, msg)
}

fn do_write(
    server: &str,
    owner: &str,
    text: String,
    title: Option<String>,
    json_output: bool,
) -> anyhow::Result<()> {
    // Analysis may wait on the remote service and its retry
    let url = format!("{}/api/entry", server);
    let body = serde_json::json!({ "text": text, "title": title, "owner_id": owner });
    let resp = client(30)?
        .post(&url)
        .json(&body)
        .send()
        .with_context(|| format!("connection failed to {}", url))?;
    let entry: serde_json::Value = check(resp)?.json()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    let entry: Entry = serde_json::from_value(entry).context("unexpected entry format")?;
    println!("Saved {}", entry.id);
    println!("Mood:     {} ({})", entry.mood, format_score(entry.mood_score));
    println!("Summary:  {}", entry.summary);
    if !entry.tags.is_empty() {
        println!("Tags:     {}", entry.tags.join(", "));
    }
    if entry.source != "external" {
        println!("(analyzed offline by keyword fallback)");
    }
    Ok(())
}

fn do_list(
    server: &str,
    owner: &str,
    mood: Option<String>,
    tag: Option<String>,
    query: Option<String>,
    json_output: bool,
) -> anyhow::Result<()> {
    let url = format!("{}/api/entries", server);
    let mut params = vec![("owner_id", owner.to_string())];
    params.extend(mood.map(|m| ("mood", m)));
    params.extend(tag.map(|t| ("tag", t)));
    params.extend(query.map(|q| ("q", q)));

    let resp = client(10)?
        .get(&url)
        .query(&params)
        .send()
        .with_context(|| format!("connection failed to {}", url))?;
    let body: serde_json::Value = check(resp)?.json()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&body["entries"])?);
        return Ok(());
    }

    let list: EntriesResponse = serde_json::from_value(body).context("unexpected list format")?;
    if list.count == 0 {
        eprintln!("No entries found");
        return Ok(());
    }
    for e in &list.entries {
        println!("{}", format_entry_line(e));
    }
    Ok(())
}

fn do_stats(server: &str, owner: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/api/stats", server);
    let resp = client(10)?
        .get(&url)
        .query(&[("owner_id", owner)])
        .send()
        .with_context(|| format!("connection failed to {}", url))?;
    let body: serde_json::Value = check(resp)?.json()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        let stats: Stats = serde_json::from_value(body).context("unexpected stats format")?;
        print!("{}", format_stats(&stats));
    }
    Ok(())
}

fn do_analyze(server: &str, text: String, title: Option<String>) -> anyhow::Result<()> {
    let url = format!("{}/api/analyze", server);
    let resp = client(30)?
        .post(&url)
        .json(&serde_json::json!({ "text": text, "title": title }))
        .send()
        .with_context(|| format!("connection failed to {}", url))?;
    let analysis: Analysis = check(resp)?.json()?;
    print_analysis(&analysis);
    Ok(())
}

/// Show the server status by calling GET /api/health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/api/health", server);
    let resp = client(10)?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Moodlog server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:        {}", body["version"].as_str().unwrap_or("?"));
            println!("Store:          {}", body["store"].as_str().unwrap_or("?"));
            println!("Analysis:       {}", body["analysis"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("moodlog: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("moodlog: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();
    let owner = cli.owner;

    let result = match cli.command {
        Commands::Write { text, title, json } => entry_text(&text, std::io::stdin())
            .and_then(|text| do_write(&server, &owner, text, title, json)),
        Commands::List {
            mood,
            tag,
            query,
            json,
        } => do_list(&server, &owner, mood, tag, query, json),
        Commands::Stats { json } => do_stats(&server, &owner, json),
        Commands::Analyze { text, title } => {
            entry_text(&text, std::io::stdin()).and_then(|text| do_analyze(&server, text, title))
        }
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("moodlog: {:#}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
