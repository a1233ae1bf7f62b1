//! HTML rendering of a report.
//!
//! Rendering is a pure function of the report and the pass lookups. The
//! output is one self-contained document: styles are inline and photos are
//! embedded as data URIs, so it survives being mailed.

use super::lookups::ReportLookups;
use crate::models::{Event, Report};
use crate::utils::{escape_html, format_date, pluralize, signed_points};

const STYLE: &str = "\
body{font-family:Helvetica,Arial,sans-serif;color:#222;max-width:720px;margin:0 auto;padding:16px}\
header{display:flex;align-items:center;gap:16px;border-bottom:2px solid #1d4f91;padding-bottom:12px}\
header img{width:96px;height:96px;border-radius:48px;object-fit:cover}\
h1{font-size:22px;margin:0}h2{font-size:18px;color:#1d4f91;margin-top:24px}\
.school{color:#666;margin:4px 0 0}\
.event{border:1px solid #ddd;border-radius:6px;padding:10px 12px;margin:10px 0}\
.event .meta{color:#666;font-size:13px}\
.points{font-weight:bold;float:right}.positive{color:#2e7d32}.negative{color:#c62828}\
.teacher{display:flex;align-items:center;gap:8px;margin-top:8px;font-size:13px}\
.teacher img{width:32px;height:32px;border-radius:16px;object-fit:cover}\
.empty{color:#666;font-style:italic}";

/// A rendered report ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub subject: String,
    pub html: String,
    /// Lower-cased child forename plus child ID, used to name files.
    pub file_stem: String,
}

pub trait Renderer: Send + Sync {
    fn render(&self, report: &Report, lookups: &ReportLookups) -> Document;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }

    fn header(html: &mut String, report: &Report) {
        let name = escape_html(&report.child.full_name());
        html.push_str("<header>");
        if let Some(photo) = report.photo.as_base64() {
            html.push_str(&photo_tag(photo, &name));
        }
        html.push_str(&format!(
            r#"<div><h1>{}</h1><p class="school">{}</p></div></header>"#,
            name,
            escape_html(&report.school.name)
        ));
    }

    fn section<E: Event>(
        html: &mut String,
        title: &str,
        events: &[E],
        describe: impl Fn(&str) -> Option<String>,
        lookups: &ReportLookups,
    ) {
        let total: i32 = events.iter().map(|e| e.points()).sum();
        html.push_str(&format!(
            "<h2>{} ({})</h2>",
            escape_html(title),
            pluralize(total, "point")
        ));

        if events.is_empty() {
            html.push_str(r#"<p class="empty">Nothing new.</p>"#);
            return;
        }

        for event in events {
            let types: Vec<String> = event
                .type_ids()
                .iter()
                .map(|id| describe(id.as_str()).unwrap_or_else(|| format!("Type {}", id)))
                .collect();
            let heading = if types.is_empty() {
                title.to_string()
            } else {
                types.join(", ")
            };
            let class = if event.points() < 0 {
                "negative"
            } else {
                "positive"
            };

            html.push_str(r#"<div class="event">"#);
            html.push_str(&format!(
                r#"<span class="points {}">{}</span><strong>{}</strong>"#,
                class,
                signed_points(event.points()),
                escape_html(&heading)
            ));
            html.push_str(&format!(
                r#"<div class="meta">{}</div>"#,
                format_date(event.date())
            ));
            if !event.comments().is_empty() {
                html.push_str(&format!("<p>{}</p>", escape_html(event.comments())));
            }
            for id in event.involved_employee_ids() {
                Self::teacher(html, id, lookups);
            }
            html.push_str("</div>");
        }
    }

    fn teacher(html: &mut String, id: &str, lookups: &ReportLookups) {
        let Some(teacher) = lookups.teacher(id) else {
            return;
        };
        let name = escape_html(&teacher.display_name());
        html.push_str(r#"<div class="teacher">"#);
        if let Some(photo) = lookups.teacher_photo(id) {
            html.push_str(&photo_tag(photo, &name));
        }
        html.push_str(&format!("<span>{}</span></div>", name));
    }
}

/// Inline JPEG image. `alt` must already be escaped.
fn photo_tag(base64: &str, alt: &str) -> String {
    format!(
        r#"<img src="data:image/jpeg;base64,{}" alt="{}">"#,
        escape_html(base64),
        alt
    )
}

impl Renderer for HtmlRenderer {
    fn render(&self, report: &Report, lookups: &ReportLookups) -> Document {
        let mut html = format!(
            r#"<!DOCTYPE html><html><head><meta charset="utf-8"><title>{}</title><style>{}</style></head><body>"#,
            escape_html(&report.child.full_name()),
            STYLE
        );

        Self::header(&mut html, report);
        Self::section(
            &mut html,
            "Achievements",
            &report.achievement,
            |id| lookups.achievement_type(id).map(|t| t.description.clone()),
            lookups,
        );
        Self::section(
            &mut html,
            "Behaviour",
            &report.behaviour,
            |id| lookups.behaviour_type(id).map(|t| t.description.clone()),
            lookups,
        );
        html.push_str("</body></html>");

        Document {
            subject: format!("EduLink School Report: {}", report.child.forename),
            html,
            file_stem: format!("{}-{}", report.child.forename.to_lowercase(), report.child.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Achievement, AchievementType, Behaviour, BehaviourType, Child, ChildPhoto, Employee,
        Establishment, Photo,
    };

    fn report() -> Report {
        Report {
            child: Child {
                id: "1".to_string(),
                forename: "Alex".to_string(),
                surname: "Smith".to_string(),
                ..Default::default()
            },
            photo: ChildPhoto::Available("CHILDPHOTO".to_string()),
            school: Establishment {
                name: "Roundwood Park School".to_string(),
                ..Default::default()
            },
            behaviour: vec![Behaviour {
                id: "B1".to_string(),
                points: -1,
                type_ids: vec!["12".to_string()],
                comments: "Talking <loudly>".to_string(),
                involved_employee_ids: vec!["E1".to_string()],
                ..Default::default()
            }],
            achievement: vec![
                Achievement {
                    id: "A1".to_string(),
                    points: 2,
                    type_ids: vec!["4".to_string()],
                    ..Default::default()
                },
                Achievement {
                    id: "A2".to_string(),
                    points: 1,
                    type_ids: vec!["99".to_string()],
                    ..Default::default()
                },
            ],
            teachers: vec![Employee {
                id: "E1".to_string(),
                title: "Mrs".to_string(),
                surname: "Jones".to_string(),
                ..Default::default()
            }],
            teacher_photos: vec![Photo {
                id: "E1".to_string(),
                photo: "TEACHERPHOTO".to_string(),
                ..Default::default()
            }],
        }
    }

    fn lookups(report: &Report) -> ReportLookups {
        let mut lookups = ReportLookups::new(
            vec![AchievementType {
                id: "4".to_string(),
                description: "Excellent effort".to_string(),
                ..Default::default()
            }],
            vec![BehaviourType {
                id: "12".to_string(),
                description: "Disruption".to_string(),
                ..Default::default()
            }],
        );
        lookups.absorb(report);
        lookups
    }

    #[test]
    fn test_render_document_fields() {
        let report = report();
        let doc = HtmlRenderer::new().render(&report, &lookups(&report));
        assert_eq!(doc.subject, "EduLink School Report: Alex");
        assert_eq!(doc.file_stem, "alex-1");
        assert!(doc.html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_render_resolves_lookups() {
        let report = report();
        let html = HtmlRenderer::new().render(&report, &lookups(&report)).html;
        assert!(html.contains("Roundwood Park School"));
        assert!(html.contains("Alex Smith"));
        assert!(html.contains("Excellent effort"));
        assert!(html.contains("Disruption"));
        assert!(html.contains("Type 99"));
        assert!(html.contains("Mrs Jones"));
        assert!(html.contains("data:image/jpeg;base64,TEACHERPHOTO"));
        assert!(html.contains("data:image/jpeg;base64,CHILDPHOTO"));
    }

    #[test]
    fn test_render_totals_and_escaping() {
        let report = report();
        let html = HtmlRenderer::new().render(&report, &lookups(&report)).html;
        assert!(html.contains("Achievements (3 points)"));
        assert!(html.contains("Behaviour (-1 point)"));
        assert!(html.contains("Talking &lt;loudly&gt;"));
        assert!(!html.contains("<loudly>"));
    }

    #[test]
    fn test_siblings_sharing_a_forename_get_distinct_stems() {
        let first = report();
        let mut second = report();
        second.child.id = "2".to_string();
        let renderer = HtmlRenderer::new();
        let lookups = ReportLookups::default();
        assert_ne!(
            renderer.render(&first, &lookups).file_stem,
            renderer.render(&second, &lookups).file_stem
        );
    }

    #[test]
    fn test_render_missing_photo_and_empty_sections() {
        let mut report = report();
        report.photo = ChildPhoto::Missing;
        report.behaviour.clear();
        let html = HtmlRenderer::new()
            .render(&report, &ReportLookups::default())
            .html;
        assert!(!html.contains("CHILDPHOTO"));
        assert!(html.contains("Nothing new."));
    }
}
