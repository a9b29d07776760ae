//! Markdown rendering of escalation documents

use crate::request::EscalationRequest;
use health_metrics::{Indicator, IndicatorKind};
use trend_engine::TrendReport;
use trigger_rules::Trigger;

/// Render the document of a request around the trigger that opened it.
///
/// Agenda and linked triggers come from `request`, so re-rendering after a
/// merge picks up what the merged triggers contributed.
///
/// Sections missing their data (analysis not built, no advisory panel, no
/// trend history yet) render a short placeholder so the layout is stable.
pub fn render_document(request: &EscalationRequest, trigger: &Trigger, trends: &TrendReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# Escalation Request {}", request.id));
    lines.push(String::new());
    lines.push(format!("- **Urgency:** {}", request.urgency));
    lines.push(format!("- **Category:** {}", trigger.category));
    lines.push(format!("- **Status:** {}", request.status));
    lines.push(format!("- **Created:** {}", request.created_at.to_rfc3339()));
    lines.push(format!("- **Deadline:** {}", request.deadline.to_rfc3339()));
    lines.push(String::new());

    lines.push("## Trigger".to_string());
    lines.push(String::new());
    lines.push(format!("**{}** (`{}`, rule `{}`)", trigger.title, trigger.id, trigger.rule));
    lines.push(String::new());
    lines.push(trigger.description.clone());
    lines.push(String::new());
    lines.push(format!("- Triggered at: {}", trigger.triggered_at.to_rfc3339()));
    if !trigger.affected_systems.is_empty() {
        let systems: Vec<&str> = trigger.affected_systems.iter().map(String::as_str).collect();
        lines.push(format!("- Affected systems: {}", systems.join(", ")));
    }
    lines.push(String::new());

    lines.push("## Readings".to_string());
    lines.push(String::new());
    for indicator in Indicator::ALL {
        let value = trigger.snapshot.value_or_default(indicator);
        let shown = match indicator.kind() {
            IndicatorKind::Count => format!("{}", value as u64),
            IndicatorKind::Flag => format!("{}", value != 0.0),
            IndicatorKind::Ratio | IndicatorKind::Rate => format!("{:.3}", value),
        };
        if trigger.snapshot.get(indicator).is_some() {
            lines.push(format!("- {}: {}", indicator, shown));
        } else {
            lines.push(format!("- {}: {} (not reported)", indicator, shown));
        }
    }
    lines.push(String::new());

    lines.push("## Trend".to_string());
    lines.push(String::new());
    let known: Vec<String> = trends
        .known()
        .map(|(indicator, trend)| format!("- {}: {}", indicator, trend.as_str()))
        .collect();
    if known.is_empty() {
        lines.push("_Not enough history to classify trends._".to_string());
    } else {
        lines.extend(known);
    }
    lines.push(String::new());

    match &trigger.auto_analysis {
        Some(analysis) => {
            lines.push("## Impact".to_string());
            lines.push(String::new());
            lines.push(format!("- Risk level: {}", analysis.risk_level.as_str()));
            lines.push(format!("- Immediate: {}", analysis.impact.immediate));
            lines.push(format!("- Short term: {}", analysis.impact.short_term));
            lines.push(format!("- Long term: {}", analysis.impact.long_term));
            lines.push(String::new());
            lines.push(format!("_{}_", analysis.urgency_justification));
            lines.push(String::new());

            lines.push("## Recommended Actions".to_string());
            lines.push(String::new());
            for (i, action) in analysis.recommended_actions.iter().enumerate() {
                lines.push(format!("{}. {}", i + 1, action));
            }
        }
        None => {
            lines.push("## Impact".to_string());
            lines.push(String::new());
            lines.push("_No analysis available._".to_string());
        }
    }
    lines.push(String::new());

    lines.push("## Advisory Input".to_string());
    lines.push(String::new());
    match &trigger.advisory_input {
        Some(advisory) => {
            for opinion in &advisory.opinions {
                lines.push(format!(
                    "- **{}** ({:.2}, suggests {}): {}",
                    opinion.advisor, opinion.confidence, opinion.recommended_priority, opinion.assessment
                ));
            }
            lines.push(String::new());
            lines.push(format!("Aggregate confidence: {:.2}", advisory.aggregate_confidence));
        }
        None => lines.push("_No advisory input._".to_string()),
    }
    lines.push(String::new());

    lines.push("## Agenda".to_string());
    lines.push(String::new());
    for (i, item) in request.agenda.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, item));
    }
    lines.push(String::new());

    lines.push("## Linked Triggers".to_string());
    lines.push(String::new());
    for id in &request.trigger_ids {
        lines.push(format!("- `{}`", id));
    }

    let mut document = lines.join("\n");
    document.push('\n');
    document
}
