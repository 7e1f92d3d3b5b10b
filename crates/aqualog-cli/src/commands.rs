use std::path::Path;

use anyhow::Context;
use aqualog_sdk::{
    Container, ContainerId, ImageDraft, ImageEdit, ImageRecord, RecordId, StatsEntry, Tracker,
    TrackerConfig, WaterStats,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = TrackerConfig::load(cli.config.as_deref())?.with_data_dir_override(cli.data_dir);
    debug!(?config, "resolved configuration");
    let tracker = Tracker::open(&config)
        .await
        .with_context(|| format!("cannot open data directory {}", config.data_dir.display()))?;
    let out = Output { format: cli.format };

    match cli.command {
        Command::Container(args) => cmd_container(&tracker, &out, args.action).await,
        Command::Image(args) => cmd_image(&tracker, &out, args.action).await,
        Command::Temperature(args) => cmd_temperature(&tracker, &out, args.action),
        Command::Stats(args) => cmd_stats(&tracker, &out, args.action),
        Command::Settings(args) => cmd_settings(&tracker, &out, args.action),
        Command::Export(args) => cmd_export(&tracker, args).await,
        Command::Import(args) => cmd_import(&tracker, args).await,
    }
}

struct Output {
    format: OutputFormat,
}

impl Output {
    fn json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

async fn cmd_container(tracker: &Tracker, out: &Output, action: ContainerAction) -> anyhow::Result<()> {
    match action {
        ContainerAction::Add { name, description } => {
            let c = tracker.create_container(&name, description.as_deref())?;
            if out.json() { return out.print_json(&c); }
            println!("{} Created container {} ({})", "✓".green().bold(), c.name.bold(), c.id.as_str().cyan());
        }
        ContainerAction::List => {
            let all = tracker.containers()?;
            if out.json() { return out.print_json(&all); }
            if all.is_empty() {
                println!("No containers.");
            }
            for c in &all {
                print_container_line(c);
            }
        }
        ContainerAction::Show { id } => {
            let c = tracker.container(&ContainerId::new(id)?)?;
            if out.json() { return out.print_json(&c); }
            print_container_line(&c);
            if let Some(d) = &c.description { println!("  Description: {d}"); }
            println!("  Created: {}", c.created_at);
            println!("  Temperature section: {}", on_off(c.settings.show_temperature_section));
            println!("  Images: {}", tracker.gallery(&c.id).await?.len());
        }
        ContainerAction::Edit { id, name, description } => {
            let mut c = tracker.container(&ContainerId::new(id)?)?;
            if let Some(name) = name { c.name = name.trim().to_string(); }
            if let Some(d) = description {
                c.description = if d.trim().is_empty() { None } else { Some(d.trim().to_string()) };
            }
            tracker.update_container(&c)?;
            if out.json() { return out.print_json(&c); }
            println!("{} Updated {}", "✓".green(), c.name.bold());
        }
        ContainerAction::ToggleTemperature { id } => {
            let c = tracker.toggle_temperature_section(&ContainerId::new(id)?)?;
            if out.json() { return out.print_json(&c); }
            println!("Temperature section for {}: {}", c.name.bold(), on_off(c.settings.show_temperature_section));
        }
        ContainerAction::Remove { id } => {
            let removed = tracker.delete_container(&ContainerId::new(id.clone())?).await?;
            println!("{} Removed container {} and {} image(s)", "✓".green(), id.cyan(), removed);
        }
        ContainerAction::Prune => {
            let removed = tracker.prune_orphan_images().await?;
            println!("{} Pruned {} orphaned image(s)", "✓".green(), removed);
        }
    }
    Ok(())
}

async fn cmd_image(tracker: &Tracker, out: &Output, action: ImageAction) -> anyhow::Result<()> {
    match action {
        ImageAction::Add { container, file, date, description, mime } => {
            let bytes = std::fs::read(&file).with_context(|| format!("cannot read {}", file.display()))?;
            let mime = mime.unwrap_or_else(|| guess_mime(&file).to_string());
            let mut draft = ImageDraft::new(ContainerId::new(container)?, data_url(&mime, &bytes));
            draft.date = date;
            draft.description = description;
            let record = tracker.upload(draft).await?;
            if out.json() { return out.print_json(&Summary::from(&record)); }
            println!(
                "{} Stored {} as {} ({} bytes)",
                "✓".green().bold(),
                file.display(),
                record.id.as_str().cyan(),
                bytes.len()
            );
        }
        ImageAction::List { container } => {
            let gallery = tracker.gallery(&ContainerId::new(container)?).await?;
            if out.json() {
                let summaries: Vec<Summary<'_>> = gallery.iter().map(Summary::from).collect();
                return out.print_json(&summaries);
            }
            if gallery.is_empty() {
                println!("No images.");
            }
            for r in &gallery {
                print_image_line(r);
            }
        }
        ImageAction::Show { id, url } => {
            let id = RecordId::new(id)?;
            let record = tracker
                .image(&id)
                .await?
                .with_context(|| format!("image not found: {id}"))?;
            if out.json() {
                return if url { out.print_json(&record) } else { out.print_json(&Summary::from(&record)) };
            }
            print_image_line(&record);
            println!("  Container: {}", record.container_id.as_str().cyan());
            if !record.description.is_empty() { println!("  Description: {}", record.description); }
            println!("  Flagged for analysis: {}", on_off(record.analysis_flag));
            if url {
                println!("  URL: {}", record.url);
            } else {
                println!("  URL: {} chars", record.url.len());
            }
        }
        ImageAction::Edit { id, title, description, date, flag, unflag } => {
            let analysis_flag = match (flag, unflag) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let edit = ImageEdit { title, description, date, analysis_flag };
            let record = tracker.edit_image(&RecordId::new(id)?, edit).await?;
            if out.json() { return out.print_json(&Summary::from(&record)); }
            println!("{} Updated image", "✓".green());
            print_image_line(&record);
        }
        ImageAction::Remove { id } => {
            if tracker.delete_image(&RecordId::new(id.clone())?).await? {
                println!("{} Removed image {}", "✓".green(), id.cyan());
            } else {
                println!("No image {}", id.cyan());
            }
        }
    }
    Ok(())
}

fn cmd_temperature(tracker: &Tracker, out: &Output, action: TemperatureAction) -> anyhow::Result<()> {
    match action {
        TemperatureAction::Add { container, value } => {
            let reading = tracker.record_temperature(&ContainerId::new(container)?, value)?;
            if out.json() { return out.print_json(&reading); }
            println!("{} Recorded {:.1}°", "✓".green(), reading.value);
        }
        TemperatureAction::List { container } => {
            let readings = tracker.temperatures(&ContainerId::new(container)?)?;
            if out.json() { return out.print_json(&readings); }
            if readings.is_empty() {
                println!("No readings.");
            }
            for r in &readings {
                println!("{}  {:.1}°", r.date.dimmed(), r.value);
            }
        }
    }
    Ok(())
}

fn cmd_stats(tracker: &Tracker, out: &Output, action: StatsAction) -> anyhow::Result<()> {
    match action {
        StatsAction::Add { container, values } => {
            let entry = tracker.record_stats(&ContainerId::new(container)?, values.into())?;
            if out.json() { return out.print_json(&entry); }
            print!("{} Recorded", "✓".green());
            print_stats_line(&entry);
        }
        StatsAction::List { container, latest } => {
            let id = ContainerId::new(container)?;
            let history = if latest {
                tracker.latest_stats(&id)?.into_iter().collect()
            } else {
                tracker.stats_history(&id)?
            };
            if out.json() { return out.print_json(&history); }
            if history.is_empty() {
                println!("No stats.");
            }
            for entry in &history {
                print!("{}", entry.date.dimmed());
                print_stats_line(entry);
            }
        }
    }
    Ok(())
}

impl From<StatsValues> for WaterStats {
    fn from(v: StatsValues) -> Self {
        Self {
            ph: v.ph,
            ammonia: v.ammonia,
            nitrite: v.nitrite,
            nitrate: v.nitrate,
            hardness: v.hardness,
            co2: v.co2,
            humidity: v.humidity,
            light: v.light,
            soil_moisture: v.soil_moisture,
        }
    }
}

fn print_stats_line(entry: &StatsEntry) {
    let parts: Vec<String> = entry
        .stats
        .present()
        .into_iter()
        .map(|(name, v)| format!("{name}={v}"))
        .collect();
    println!("  {}", parts.join(" "));
}

fn cmd_settings(tracker: &Tracker, out: &Output, action: SettingsAction) -> anyhow::Result<()> {
    let settings = match action {
        SettingsAction::Show => tracker.settings()?,
        SettingsAction::Webhook { url, clear } => {
            tracker.set_webhook_url(if clear { None } else { url })?
        }
    };
    if out.json() { return out.print_json(&settings); }
    match &settings.webhook_url {
        Some(url) => println!("Webhook: {}", url.blue()),
        None => println!("Webhook: {}", "(not set)".dimmed()),
    }
    Ok(())
}

async fn cmd_export(tracker: &Tracker, args: ExportArgs) -> anyhow::Result<()> {
    let doc = tracker.export_snapshot().await?;
    let json = if args.pretty { doc.to_json_pretty()? } else { doc.to_json()? };
    match &args.out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!(
                "{} Exported {} image(s) and {} container(s) to {}",
                "✓".green().bold(),
                doc.images.len(),
                doc.containers.len(),
                path.display().to_string().bold()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn cmd_import(tracker: &Tracker, args: ImportArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("cannot read {}", args.file.display()))?;
    let report = tracker.import_snapshot(&text).await?;
    print!("{} Imported {} image(s)", "✓".green().bold(), report.images_written);
    match report.containers_written {
        Some(n) => println!(" and {n} container(s)"),
        None => println!("; container list left unchanged"),
    }
    Ok(())
}

/// Listing view of an image without its payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary<'a> {
    id: &'a str,
    container_id: &'a str,
    date: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    description: &'a str,
    analysis_flag: bool,
}

impl<'a> From<&'a ImageRecord> for Summary<'a> {
    fn from(r: &'a ImageRecord) -> Self {
        Self {
            id: r.id.as_str(),
            container_id: r.container_id.as_str(),
            date: &r.date,
            title: r.title.as_deref(),
            description: &r.description,
            analysis_flag: r.analysis_flag,
        }
    }
}

fn print_container_line(c: &Container) {
    println!("{}  {}", c.id.as_str().cyan(), c.name.bold());
}

fn print_image_line(r: &ImageRecord) {
    let flag = if r.analysis_flag { " [flagged]".yellow().to_string() } else { String::new() };
    let label = r.title.as_deref().unwrap_or(&r.description);
    println!("{}  {}  {}{}", r.id.as_str().cyan(), r.date.dimmed(), label, flag);
}

fn on_off(v: bool) -> colored::ColoredString {
    if v { "on".green() } else { "off".dimmed() }
}

fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_encodes_base64() {
        assert_eq!(data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
        assert_eq!(data_url("text/plain", b""), "data:text/plain;base64,");
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(guess_mime(Path::new("a.PNG")), "image/png");
        assert_eq!(guess_mime(Path::new("dir/b.jpeg")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn stats_values_map_onto_water_stats() {
        let stats: WaterStats = StatsValues {
            ammonia: Some(0.25),
            light: Some(12.0),
            ..StatsValues::default()
        }
        .into();
        assert_eq!(stats.present(), vec![("ammonia", 0.25), ("light", 12.0)]);
    }

    #[test]
    fn summary_drops_payload() {
        let record = ImageRecord {
            id: RecordId::new("1").unwrap(),
            container_id: ContainerId::new("t").unwrap(),
            url: "data:,huge".into(),
            date: "2024-01-01".into(),
            title: None,
            description: "d".into(),
            analysis_flag: true,
        };
        let json = serde_json::to_string(&Summary::from(&record)).unwrap();
        assert_eq!(
            json,
            r#"{"id":"1","containerId":"t","date":"2024-01-01","description":"d","analysisFlag":true}"#
        );
    }
}
