// Server-side HTML for the public test page.

use crate::domain::TestAttemptSummary;
use crate::use_cases::{PageMetadata, TestPage};

const CSS: &str = "body{font-family:system-ui,sans-serif;margin:0;color:#1f2933}\
.container{max-width:48rem;margin:0 auto;padding:2rem 1rem}\
.space-y>*+*{margin-top:2rem}\
.meta{color:#52606d}\
table{border-collapse:collapse;width:100%}\
th,td{text-align:left;padding:.5rem;border-bottom:1px solid #e4e7eb}\
.start{display:inline-block;padding:.6rem 1.2rem;background:#2563eb;color:#fff;\
border-radius:.4rem;text-decoration:none}";

// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn plural(count: u32, word: &str) -> String {
    if count == 1 {
        format!("1 {word}")
    } else {
        format!("{count} {word}s")
    }
}

fn document(metadata: &PageMetadata, body: &str) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", html_escape(&metadata.title)));
    html.push_str(&format!(
        "<meta name=\"description\" content=\"{}\">\n",
        html_escape(&metadata.description)
    ));
    if let Some(og) = &metadata.open_graph {
        html.push_str(&format!(
            "<meta property=\"og:title\" content=\"{}\">\n",
            html_escape(&og.title)
        ));
        html.push_str(&format!(
            "<meta property=\"og:description\" content=\"{}\">\n",
            html_escape(&og.description)
        ));
    }
    html.push_str("<style>");
    html.push_str(CSS);
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str(body);
    html.push_str("</body>\n</html>\n");

    html
}

/// Render the test details page for a resolved test.
pub fn test_page(page: &TestPage) -> String {
    let test = &page.test;
    let mut body = String::new();

    body.push_str("<div class=\"container space-y\">\n");
    body.push_str("<section class=\"test-details\">\n");
    body.push_str(&format!("<h1>{}</h1>\n", html_escape(&test.title)));
    body.push_str(&format!(
        "<p class=\"description\">{}</p>\n",
        html_escape(&page.metadata.description)
    ));

    let mut facts = vec![plural(test.question_count, "question")];
    if let Some(minutes) = test.duration_minutes {
        facts.push(plural(minutes, "minute"));
    }
    body.push_str(&format!("<p class=\"meta\">{}</p>\n", facts.join(" &middot; ")));

    body.push_str(&format!(
        "<a class=\"start\" href=\"/tests/{}/take\" data-test-id=\"{}\">Start test</a>\n",
        html_escape(&test.slug),
        html_escape(&test.id)
    ));
    body.push_str("</section>\n");

    if page.is_authenticated {
        body.push_str(&attempts_section(&page.attempts));
    } else {
        // Guests keep progress in guest storage only.
        body.push_str(
            "<p class=\"guest-note\">You are taking this test as a guest. \
             Sign in to keep your results.</p>\n",
        );
    }

    body.push_str("</div>\n");
    document(&page.metadata, &body)
}

fn attempts_section(attempts: &[TestAttemptSummary]) -> String {
    let mut html = String::new();
    html.push_str("<section class=\"attempts\">\n<h2>Your attempts</h2>\n");

    if attempts.is_empty() {
        html.push_str("<p class=\"meta\">You have not taken this test yet.</p>\n");
        html.push_str("</section>\n");
        return html;
    }

    html.push_str("<table>\n<thead>");
    html.push_str("<tr><th>Started</th><th>Status</th><th>Score</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for attempt in attempts {
        let score = attempt
            .percentage_score
            .map(|score| format!("{score:.0}%"))
            .unwrap_or_else(|| "-".to_string());
        html.push_str(&format!(
            "<tr data-attempt-id=\"{}\"><td><time data-epoch-ms=\"{}\"></time></td>\
             <td>{}</td><td>{}</td></tr>\n",
            html_escape(&attempt.id),
            attempt.started_at,
            attempt.status.label(),
            score
        ));
    }
    html.push_str("</tbody></table>\n</section>\n");

    html
}

/// Render the page shown when no public test matches the slug.
pub fn not_found_page() -> String {
    let metadata = PageMetadata::not_found();
    let body = format!(
        "<div class=\"container\">\n<h1>{}</h1>\n<p class=\"meta\">{}</p>\n</div>\n",
        html_escape(&metadata.title),
        html_escape(&metadata.description)
    );
    document(&metadata, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttemptStatus, PublicTest};

    fn page(is_authenticated: bool, attempts: Vec<TestAttemptSummary>) -> TestPage {
        let test = PublicTest {
            id: "t-1".to_string(),
            slug: "logic-101".to_string(),
            title: "Logic <101> & \"friends\"".to_string(),
            description: Some("Reasoning drills".to_string()),
            question_count: 1,
            duration_minutes: Some(20),
        };
        TestPage {
            metadata: PageMetadata::for_test(&test),
            test,
            attempts,
            is_authenticated,
        }
    }

    #[test]
    fn when_title_has_markup_then_it_is_escaped_everywhere() {
        let html = test_page(&page(false, Vec::new()));

        assert!(html.contains("<title>Logic &lt;101&gt; &amp; &quot;friends&quot;</title>"));
        assert!(html.contains("<h1>Logic &lt;101&gt; &amp; &quot;friends&quot;</h1>"));
        assert!(!html.contains("<101>"));
    }

    #[test]
    fn when_test_is_rendered_then_head_carries_description_and_open_graph() {
        let html = test_page(&page(false, Vec::new()));

        assert!(html.contains("<meta name=\"description\" content=\"Reasoning drills\">"));
        assert!(html.contains("<meta property=\"og:description\" content=\"Reasoning drills\">"));
        assert!(html.contains("1 question &middot; 20 minutes"));
    }

    #[test]
    fn when_viewer_is_guest_then_sign_in_note_is_shown_instead_of_attempts() {
        let html = test_page(&page(false, Vec::new()));

        assert!(html.contains("class=\"guest-note\""));
        assert!(!html.contains("Your attempts"));
    }

    #[test]
    fn when_viewer_is_authenticated_then_attempts_are_listed() {
        let attempts = vec![TestAttemptSummary {
            id: "a-1".to_string(),
            status: AttemptStatus::Completed,
            started_at: 100,
            completed_at: Some(200),
            percentage_score: Some(79.6),
        }];

        let html = test_page(&page(true, attempts));

        assert!(html.contains("Your attempts"));
        assert!(html.contains("<td>Completed</td><td>80%</td>"));
        assert!(!html.contains("guest-note"));
    }

    #[test]
    fn when_not_found_page_is_rendered_then_fallback_metadata_is_used() {
        let html = not_found_page();

        assert!(html.contains("<title>Test Not Found</title>"));
        assert!(html.contains("The requested test could not be found"));
        assert!(!html.contains("og:title"));
    }
}
