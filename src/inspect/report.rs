//! Inspect report types and terminal formatting.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::dataset::{Annotation, CategoryId, Image};
use crate::palette::Rgb;

/// The result of inspecting a dataset.
#[derive(Clone, Debug, Serialize)]
pub struct InspectReport {
    pub summary: SummarySection,
    /// Every category in ascending id order.
    pub classes: Vec<ClassEntry>,
    /// Annotations pointing at a category that does not exist.
    pub unknown_category_annotations: usize,
    #[serde(skip)]
    pub(crate) bar_width: usize,
}

/// Summary counts for the dataset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SummarySection {
    pub images: usize,
    pub categories: usize,
    pub annotations: usize,
    /// Number of images that have at least one annotation.
    pub annotated_images: usize,
}

/// One category with its annotation count.
#[derive(Clone, Debug, Serialize)]
pub struct ClassEntry {
    pub id: CategoryId,
    pub name: String,
    pub annotations: usize,
}

impl ClassEntry {
    /// The `name (id)` label used in class lists.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;

        writeln!(f, "┌─ Summary ─────────────────────────────────────────")?;
        writeln!(f, "│   Images:        {:>8}", format_number(s.images))?;
        writeln!(f, "│   Categories:    {:>8}", format_number(s.categories))?;
        writeln!(f, "│   Annotations:   {:>8}", format_number(s.annotations))?;
        writeln!(
            f,
            "│   Annotated:     {:>8} of {} ({})",
            format_number(s.annotated_images),
            format_number(s.images),
            fmt_percent(s.annotated_images, s.images)
        )?;
        writeln!(f, "└───────────────────────────────────────────────────")?;
        writeln!(f)?;

        writeln!(f, "┌─ Classes ({}) ", self.classes.len())?;
        if self.classes.is_empty() {
            writeln!(f, "│   No categories defined.")?;
        } else {
            let max_count = self
                .classes
                .iter()
                .map(|c| c.annotations)
                .max()
                .unwrap_or(0);
            for class in &self.classes {
                writeln!(
                    f,
                    "│   {:<24} {:>7}  {}",
                    truncate_label(&class.label(), 24),
                    format_number(class.annotations),
                    render_bar(class.annotations, max_count, self.bar_width)
                )?;
            }
        }
        if self.unknown_category_annotations > 0 {
            writeln!(
                f,
                "│   {:<24} {:>7}",
                "(unknown category)",
                format_number(self.unknown_category_annotations)
            )?;
        }
        writeln!(f, "└───────────────────────────────────────────────────")?;

        Ok(())
    }
}

/// One image and its annotations, as shown by `show`.
#[derive(Clone, Debug, Serialize)]
pub struct SampleView<'a> {
    /// 1-based position in the image list.
    pub position: usize,
    pub total: usize,
    pub image: &'a Image,
    pub path: Option<PathBuf>,
    pub annotations: Vec<SampleAnnotation<'a>>,
}

impl SampleView<'_> {
    /// The `Image i/n` position label.
    pub fn label(&self) -> String {
        format!("Image {}/{}", self.position, self.total)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SampleAnnotation<'a> {
    #[serde(flatten)]
    pub annotation: &'a Annotation,
    /// `None` when the category is missing from the dataset.
    pub category_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
}

impl fmt::Display for SampleView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let img = self.image;
        writeln!(f, "{}: {} (id {})", self.label(), img.file_name, img.id)?;
        match (img.width, img.height) {
            (Some(w), Some(h)) => writeln!(f, "  size: {}x{}", w, h)?,
            _ => writeln!(f, "  size: unknown")?,
        }
        if let Some(path) = &self.path {
            writeln!(f, "  path: {}", path.display())?;
        }

        if self.annotations.is_empty() {
            return writeln!(f, "  no annotations");
        }
        writeln!(f, "  annotations ({}):", self.annotations.len())?;
        for entry in &self.annotations {
            let ann = entry.annotation;
            let label = match entry.category_name {
                Some(name) => format!("{} ({})", name, ann.category_id),
                None => format!("<missing category {}>", ann.category_id),
            };
            write!(f, "    #{:<6} {}", ann.id, label)?;
            if let Some([x, y, w, h]) = ann.bbox {
                write!(f, "  bbox [{}, {}, {}, {}]", x, y, w, h)?;
            }
            if let Some(color) = entry.color {
                write!(f, "  {}", color)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Format a number with thousands separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

fn fmt_percent(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        "n/a".to_string()
    } else {
        format!("{:.1}%", (numerator as f64 / denominator as f64) * 100.0)
    }
}

fn render_bar(count: usize, max_count: usize, width: usize) -> String {
    if max_count == 0 || width == 0 {
        return String::new();
    }
    let filled = ((count * width) / max_count).min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}

/// Truncate a label to fit in the display column (char-aware).
fn truncate_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else {
        let head: String = label.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
