use anyhow::Result;
use console::{Term, style};
use serde::Serialize;

use crate::migrate::MigratedComment;
use crate::models::PublicComment;
use crate::projection::{Projection, ProjectionState};
use crate::token::SessionToken;

pub struct Output {
    term: Term,
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self {
            term: Term::stdout(),
            json,
        }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let output = serde_json::to_string_pretty(value)?;
        self.term.write_line(&output)?;
        Ok(())
    }

    fn text_width(&self) -> usize {
        let (_, cols) = self.term.size();
        usize::from(cols).clamp(40, 100) - 4
    }

    fn print_comment(&self, comment: &PublicComment) -> Result<()> {
        let mut header = format!(
            "{} {}",
            style(&comment.id).cyan().bold(),
            style(&comment.name).bold()
        );
        if comment.edited {
            header.push_str(&format!(" {}", style("(edited)").dim()));
        }
        header.push_str(&format!(" [{}]", style(&comment.date).dim()));
        if comment.is_mine {
            header.push_str(&format!(" {}", style("yours").green()));
        }
        self.term.write_line(&header)?;

        let options = textwrap::Options::new(self.text_width())
            .initial_indent("  ")
            .subsequent_indent("  ");
        self.term
            .write_line(&textwrap::fill(&comment.text, options))?;
        Ok(())
    }

    pub fn comment_posted(&self, comment: &PublicComment) -> Result<()> {
        if self.json {
            return self.print_json(comment);
        }

        self.term.write_line(&format!(
            "{} {}",
            style("Posted comment:").green(),
            style(&comment.id).cyan().bold()
        ))?;
        self.term.write_line(&format!("  Name: {}", comment.name))?;
        self.term.write_line(&format!("  Date: {}", comment.date))?;
        Ok(())
    }

    pub fn comment_updated(&self, comment: &PublicComment) -> Result<()> {
        if self.json {
            return self.print_json(comment);
        }

        self.term.write_line(&format!(
            "{} {}",
            style("Updated comment:").green(),
            style(&comment.id).cyan().bold()
        ))?;
        self.term.write_line(&format!("  Name: {}", comment.name))?;
        self.term.write_line(&format!("  Text: {}", comment.text))?;
        Ok(())
    }

    pub fn comment_deleted(&self, id: &str) -> Result<()> {
        self.term.write_line(&format!(
            "{} {}",
            style("Deleted comment:").green(),
            style(id).cyan().bold()
        ))?;
        Ok(())
    }

    pub fn comment_list(&self, comments: &[PublicComment]) -> Result<()> {
        if self.json {
            return self.print_json(comments);
        }

        if comments.is_empty() {
            self.term.write_line("No comments yet.")?;
            return Ok(());
        }

        for comment in comments {
            self.print_comment(comment)?;
            self.term.write_line("")?;
        }
        Ok(())
    }

    /// Redraws the live view after a projection update.
    pub fn watch_frame(&self, view: &Projection) -> Result<()> {
        if self.json {
            return self.print_json(view.comments());
        }

        if self.term.is_term() {
            self.term.clear_screen()?;
        }

        match view.state() {
            ProjectionState::Idle | ProjectionState::Loading => {
                self.term.write_line(&style("Loading...").dim().to_string())?;
                return Ok(());
            }
            ProjectionState::Live => {
                self.term.write_line(&format!(
                    "{} {} comment(s)",
                    style("Live:").green().bold(),
                    view.comments().len()
                ))?;
            }
            ProjectionState::Error(reason) => {
                self.term.write_line(&format!(
                    "{} {}",
                    style("Connection problem:").red().bold(),
                    reason
                ))?;
            }
        }
        self.term.write_line("")?;
        self.comment_list(view.comments())
    }

    pub fn token(&self, token: &SessionToken) -> Result<()> {
        self.term.write_line(token.as_str())?;
        Ok(())
    }

    pub fn migrated(&self, migrated: &[MigratedComment]) -> Result<()> {
        if self.json {
            let rows: Vec<serde_json::Value> = migrated
                .iter()
                .map(|m| serde_json::json!({ "sourceId": m.source_id, "id": m.id, "name": m.name }))
                .collect();
            return self.print_json(&rows);
        }

        for entry in migrated {
            self.term.write_line(&format!(
                "Migrated comment from: {} ({} -> {})",
                entry.name,
                style(&entry.source_id).dim(),
                style(&entry.id).cyan()
            ))?;
        }
        self.term.write_line(&format!(
            "{} {} comment(s) migrated",
            style("Done:").green(),
            migrated.len()
        ))?;
        Ok(())
    }
}
