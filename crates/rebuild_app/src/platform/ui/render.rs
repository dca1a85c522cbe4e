use std::io::{self, Write};

use chrono::Local;
use rebuild_core::{denominator, percentage, NoticeLevel, PollerViewModel};
use rebuild_engine::{KnowledgeEntry, KnowledgeStatus};

const BAR_WIDTH: usize = 20;

/// Writes progress and notices as plain lines; a line is only repeated when
/// its text changes.
pub struct TerminalRenderer<W: Write> {
    out: W,
    last_line: Option<String>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_line: None,
        }
    }

    pub fn render(&mut self, view: &PollerViewModel) -> io::Result<()> {
        let line = progress_line(view);
        if line.is_some() && line != self.last_line {
            if let Some(text) = line.as_deref() {
                writeln!(self.out, "{text}")?;
            }
        }
        self.last_line = line;
        self.out.flush()
    }

    pub fn notice(&mut self, level: NoticeLevel, message: &str) -> io::Result<()> {
        let stamp = Local::now().format("%H:%M:%S");
        writeln!(self.out, "[{stamp}] {}: {message}", level_label(level))?;
        self.out.flush()
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn level_label(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "done",
        NoticeLevel::Error => "error",
    }
}

/// `None` while the progress display is hidden.
pub fn progress_line(view: &PollerViewModel) -> Option<String> {
    let progress = &view.progress;
    if !progress.visible {
        return None;
    }
    if progress.indeterminate {
        return Some(format!("[{}]  ..  {}", "~".repeat(BAR_WIDTH), progress.status));
    }
    let filled = usize::from(progress.percent) * BAR_WIDTH / 100;
    Some(format!(
        "[{}{}] {:>3}%  {}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        progress.percent,
        progress.status
    ))
}

/// One-shot progress summary for `rebuild progress`.
pub fn progress_summary(processed: u64, total: u64, active: bool) -> String {
    format!(
        "{}% ({} / {}), {}",
        percentage(processed, total),
        processed,
        denominator(processed, total),
        if active { "rebuild running" } else { "no rebuild running" }
    )
}

pub fn status_lines(status: &KnowledgeStatus) -> Vec<String> {
    if status.is_empty() {
        return vec!["No knowledge index has been built yet.".to_string()];
    }
    let mut lines = vec!["Knowledge index".to_string()];
    if let Some(snapshot) = status.snapshot_id.as_deref() {
        lines.push(format!("  Snapshot:  {snapshot}"));
    }
    if let Some(generated) = status.generated_at.as_deref() {
        lines.push(format!("  Generated: {generated}"));
    }
    lines.push(format!("  Chunks:    {}", status.chunk_count));
    lines.push(format!("  Entries:   {}", status.entry_count));
    lines.push(format!("  Documents: {}", status.files_count));
    if !status.sources.is_empty() {
        lines.push("Sources".to_string());
        lines.extend(
            status
                .sources
                .iter()
                .map(|source| format!("  {}: {}", source.label, source.count)),
        );
    }
    if status.latest_entries.is_empty() {
        lines.push("No knowledge entries indexed yet.".to_string());
    } else {
        lines.push("Latest entries".to_string());
        lines.extend(status.latest_entries.iter().flat_map(entry_lines));
    }
    lines
}

fn entry_lines(entry: &KnowledgeEntry) -> Vec<String> {
    let title = entry.title.as_deref().unwrap_or("(untitled)");
    let mut lines = vec![match entry.link.as_deref() {
        Some(link) => format!("  {title} <{link}>"),
        None => format!("  {title}"),
    }];
    let meta: Vec<String> = [
        ("Source", &entry.source),
        ("Category", &entry.category),
        ("Updated", &entry.updated),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_deref().map(|value| format!("{label}: {value}")))
    .collect();
    if !meta.is_empty() {
        lines.push(format!("    {}", meta.join(" | ")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rebuild_core::{Phase, ProgressBarView};
    use rebuild_engine::KnowledgeSource;

    fn view(percent: u8, status: &str) -> PollerViewModel {
        PollerViewModel {
            phase: Phase::Running,
            progress: ProgressBarView {
                visible: true,
                indeterminate: false,
                percent,
                status: status.to_string(),
            },
            ..PollerViewModel::default()
        }
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(
            progress_line(&view(25, "Processing 25 / 100...")).as_deref(),
            Some("[#####...............]  25%  Processing 25 / 100...")
        );
        assert_eq!(
            progress_line(&view(100, "done")).as_deref(),
            Some("[####################] 100%  done")
        );
    }

    #[test]
    fn hidden_progress_renders_nothing() {
        assert_eq!(progress_line(&PollerViewModel::default()), None);
    }

    #[test]
    fn unchanged_lines_are_not_repeated() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        renderer.render(&view(10, "a")).unwrap();
        renderer.render(&view(10, "a")).unwrap();
        renderer.render(&view(20, "b")).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn summary_uses_clamped_numbers() {
        assert_eq!(
            progress_summary(100, 50, true),
            "100% (100 / 100), rebuild running"
        );
        assert_eq!(progress_summary(0, 0, false), "0% (0 / 1), no rebuild running");
    }

    #[test]
    fn status_lists_sources() {
        let status = KnowledgeStatus {
            snapshot_id: Some("snap-1".to_string()),
            chunk_count: 10,
            sources: vec![KnowledgeSource {
                label: "Pages".to_string(),
                count: 4,
            }],
            ..KnowledgeStatus::default()
        };
        let lines = status_lines(&status);
        assert_eq!(lines[1], "  Snapshot:  snap-1");
        assert!(lines.contains(&"  Pages: 4".to_string()));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("No knowledge entries indexed yet.")
        );
        assert_eq!(
            status_lines(&KnowledgeStatus::default()),
            vec!["No knowledge index has been built yet.".to_string()]
        );
    }

    #[test]
    fn status_lists_latest_entries_with_metadata() {
        let status = KnowledgeStatus {
            chunk_count: 2,
            latest_entries: vec![
                KnowledgeEntry {
                    title: Some("Opening hours".to_string()),
                    link: Some("https://example.com/hours".to_string()),
                    source: Some("Pages".to_string()),
                    updated: Some("3 days ago".to_string()),
                    ..KnowledgeEntry::default()
                },
                KnowledgeEntry::default(),
            ],
            ..KnowledgeStatus::default()
        };
        let lines = status_lines(&status);
        let tail = &lines[lines.len() - 4..];
        assert_eq!(
            tail,
            [
                "Latest entries",
                "  Opening hours <https://example.com/hours>",
                "    Source: Pages | Updated: 3 days ago",
                "  (untitled)",
            ]
        );
    }
}
