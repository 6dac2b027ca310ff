//! Plan rendering for the terminal.
//!
//! Pure formatting: six labelled sections in fixed order, every list
//! item in its original order, no field omitted. Empty lists render an
//! explicit placeholder rather than disappearing.

use std::fmt::Write as _;

use fincoach_protocol::PlanRecord;

pub fn plan(record: &PlanRecord) -> String {
    let mut out = String::new();
    text_section(&mut out, "Main Goal", &record.goal);
    numbered_section(&mut out, "Action Steps", &record.steps);
    text_section(&mut out, "Timeline", &record.timeline);
    text_section(&mut out, "Estimated Costs", &record.estimated_cost);
    bulleted_section(&mut out, "Potential Risks", &record.risks);
    bulleted_section(&mut out, "Recommendations", &record.recommendations);
    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

fn text_section(out: &mut String, title: &str, body: &str) {
    let _ = writeln!(out, "{title}\n  {body}\n");
}

fn numbered_section(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out, "{title}");
    if items.is_empty() {
        let _ = writeln!(out, "  (none listed)");
    } else {
        for (index, item) in items.iter().enumerate() {
            let _ = writeln!(out, "  {}. {item}", index + 1);
        }
    }
    let _ = writeln!(out);
}

fn bulleted_section(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out, "{title}");
    if items.is_empty() {
        let _ = writeln!(out, "  (none listed)");
    } else {
        for item in items {
            let _ = writeln!(out, "  - {item}");
        }
    }
    let _ = writeln!(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> PlanRecord {
        PlanRecord {
            goal: "save a $20k emergency fund".to_string(),
            steps: vec![
                "open a high-yield savings account".to_string(),
                "automate $500 monthly transfers".to_string(),
                "review progress quarterly".to_string(),
            ],
            timeline: "40 months".to_string(),
            estimated_cost: "$20,000".to_string(),
            risks: vec![
                "income disruption".to_string(),
                "inflation outpacing yield".to_string(),
            ],
            recommendations: vec!["keep the fund in a separate bank".to_string()],
        }
    }

    #[test]
    fn renders_every_section_in_order() {
        let rendered = plan(&sample_plan());
        let sections = [
            "Main Goal",
            "Action Steps",
            "Timeline",
            "Estimated Costs",
            "Potential Risks",
            "Recommendations",
        ];
        let mut last = 0;
        for section in sections {
            let pos = rendered
                .find(section)
                .unwrap_or_else(|| panic!("missing section {section}"));
            assert!(pos >= last, "{section} rendered out of order");
            last = pos;
        }
    }

    #[test]
    fn renders_list_items_in_original_order() {
        let rendered = plan(&sample_plan());
        let first = rendered.find("1. open a high-yield savings account").unwrap();
        let second = rendered.find("2. automate $500 monthly transfers").unwrap();
        let third = rendered.find("3. review progress quarterly").unwrap();
        assert!(first < second && second < third);

        let risk_a = rendered.find("- income disruption").unwrap();
        let risk_b = rendered.find("- inflation outpacing yield").unwrap();
        assert!(risk_a < risk_b);
    }

    #[test]
    fn omits_no_field() {
        let rendered = plan(&sample_plan());
        assert!(rendered.contains("save a $20k emergency fund"));
        assert!(rendered.contains("40 months"));
        assert!(rendered.contains("$20,000"));
        assert!(rendered.contains("keep the fund in a separate bank"));
    }

    #[test]
    fn empty_lists_render_placeholder() {
        let mut record = sample_plan();
        record.risks.clear();
        record.recommendations.clear();
        let rendered = plan(&record);
        assert_eq!(rendered.matches("(none listed)").count(), 2);
        assert!(rendered.contains("Potential Risks"));
        assert!(rendered.contains("Recommendations"));
    }
}
