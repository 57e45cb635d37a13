use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{
    AnalyzedImage, ColorAnalysis, Insight, InsightKind, Milestone, MilestoneDetails,
    WeeklySummary,
};

const MAX_INFO_LINES: usize = 5;

pub fn build_update(
    now: NaiveDateTime,
    analyses: &[AnalyzedImage],
    insights: &[Insight],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "🌱 Grow Update 🌱");
    let _ = writeln!(output);
    let _ = writeln!(output, "Date: {}", now.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(output);

    if !analyses.is_empty() {
        let _ = writeln!(output, "📸 Image Analysis:");
        for (idx, image) in analyses.iter().enumerate() {
            let analysis = &image.analysis;
            let _ = writeln!(output, "  Image {}: {}", idx + 1, image.filename);
            let _ = writeln!(
                output,
                "    Health: {}",
                analysis.estimated_health.description()
            );
            if let ColorAnalysis::Available {
                green_dominance, ..
            } = analysis.color_analysis
            {
                let _ = writeln!(output, "    Green dominance: {:.2}", green_dominance);
            }
            let _ = writeln!(output, "    Brightness: {:.1}/255", analysis.brightness);
            let _ = writeln!(output);
        }
    }

    if !insights.is_empty() {
        write_insights(&mut output, insights);
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "---");
    let _ = writeln!(output, "#grow #plants #documentation #gardening");

    output
}

fn write_insights(output: &mut String, insights: &[Insight]) {
    let warnings: Vec<&Insight> = insights
        .iter()
        .filter(|i| i.kind == InsightKind::Warning)
        .collect();
    let infos: Vec<&Insight> = insights
        .iter()
        .filter(|i| i.kind == InsightKind::Info)
        .collect();

    let _ = writeln!(output, "📊 Data Insights:");

    if !warnings.is_empty() {
        let _ = writeln!(output, "  ⚠️ Warnings:");
        for warning in &warnings {
            let _ = writeln!(output, "    • {}", warning.message);
        }
        if !infos.is_empty() {
            let _ = writeln!(output);
        }
    }

    if !infos.is_empty() {
        let _ = writeln!(output, "  ℹ️ Information:");
        for info in infos.iter().take(MAX_INFO_LINES) {
            let _ = writeln!(output, "    • {}", info.message);
        }
    }
}

fn milestone_title(milestone: &Milestone) -> &'static str {
    match milestone {
        Milestone::Germination => "🌱 Germination Milestone!",
        Milestone::Vegetative => "🌿 Entered Vegetative Stage!",
        Milestone::Flowering => "🌸 Flowering Has Begun!",
        Milestone::Harvest => "🎉 Harvest Time!",
        Milestone::Other(_) => "🌱 Growth Milestone!",
    }
}

pub fn build_milestone(
    now: NaiveDateTime,
    milestone: &Milestone,
    details: Option<&MilestoneDetails>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{}", milestone_title(milestone));
    let _ = writeln!(output);
    let _ = writeln!(output, "Date: {}", now.format("%Y-%m-%d"));
    let _ = writeln!(output);

    match details {
        Some(MilestoneDetails::Fields(fields)) if !fields.is_empty() => {
            let _ = writeln!(output, "Details:");
            for (key, value) in fields {
                let _ = writeln!(output, "  • {key}: {value}");
            }
            let _ = writeln!(output);
        }
        Some(MilestoneDetails::Note(note)) if !note.is_empty() => {
            let _ = writeln!(output, "Details:");
            let _ = writeln!(output, "  • {note}");
            let _ = writeln!(output);
        }
        _ => {}
    }

    let _ = writeln!(output, "---");
    let _ = writeln!(output, "#grow #milestone #{}", hashtag(milestone.label()));

    output
}

fn hashtag(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

pub fn build_weekly_summary(now: NaiveDateTime, summary: &WeeklySummary) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "📅 Weekly Grow Summary 📅");
    let _ = writeln!(output);
    let _ = writeln!(output, "Week ending: {}", now.format("%Y-%m-%d"));
    let _ = writeln!(output);

    if let Some(count) = summary.images_processed {
        let _ = writeln!(output, "📸 Images processed: {count}");
    }
    if let Some(health) = &summary.avg_health {
        let _ = writeln!(output, "🌱 Average health: {health}");
    }
    if let Some(rate) = &summary.growth_rate {
        let _ = writeln!(output, "📈 Growth rate: {rate}");
    }
    if let Some(notes) = &summary.notes {
        let _ = writeln!(output);
        let _ = writeln!(output, "Notes:");
        let _ = writeln!(output, "{notes}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "---");
    let _ = writeln!(output, "#grow #weeklysummary #progress");

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, PixelBuffer};
    use crate::insights::{parse_record, InsightEngine};
    use crate::models::{Health, InsightCategory};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 3)
            .unwrap()
            .and_hms_opt(18, 45, 0)
            .unwrap()
    }

    fn analyzed(filename: &str, rgb: [u8; 3]) -> AnalyzedImage {
        let buffer = PixelBuffer::new(1, 1, 3, rgb.to_vec(), "JPEG");
        AnalyzedImage {
            filename: filename.to_string(),
            analysis: analyze(&buffer).unwrap(),
            analyzed_at: now(),
        }
    }

    fn info(n: usize) -> Insight {
        Insight::info(InsightCategory::Growth, format!("info {n}"))
    }

    fn warning(n: usize) -> Insight {
        Insight::warning(InsightCategory::Temperature, format!("warning {n}"))
    }

    #[test]
    fn empty_update_has_header_and_footer_only() {
        let report = build_update(now(), &[], &[]);
        assert_eq!(
            report,
            "🌱 Grow Update 🌱\n\nDate: 2026-05-03 18:45\n\n---\n#grow #plants #documentation #gardening\n"
        );
    }

    #[test]
    fn image_section_formats_each_analysis() {
        let images = vec![analyzed("leaf.jpg", [40, 200, 60]), analyzed("dry.jpg", [150, 90, 60])];
        let report = build_update(now(), &images, &[]);

        assert!(report.contains("📸 Image Analysis:"));
        assert!(report.contains("  Image 1: leaf.jpg\n    Health: Excellent - Strong green coloration\n    Green dominance: 2.00\n    Brightness: 100.0/255\n"));
        assert!(report.contains("  Image 2: dry.jpg\n    Health: Poor - Low green coloration, check plant health\n"));
        assert!(!report.contains("📊 Data Insights:"));
    }

    #[test]
    fn each_image_entry_ends_with_blank_line() {
        let images = vec![analyzed("a.jpg", [40, 200, 60]), analyzed("b.jpg", [40, 200, 60])];
        let report = build_update(now(), &images, &[info(1)]);

        assert!(report.contains("    Brightness: 100.0/255\n\n  Image 2: b.jpg\n"));
        assert!(report.contains("    Brightness: 100.0/255\n\n📊 Data Insights:"));
    }

    #[test]
    fn grayscale_image_omits_green_dominance() {
        let buffer = PixelBuffer::new(1, 1, 1, vec![128], "PNG");
        let image = AnalyzedImage {
            filename: "night.png".to_string(),
            analysis: analyze(&buffer).unwrap(),
            analyzed_at: now(),
        };
        assert_eq!(image.analysis.estimated_health, Health::Unknown);

        let report = build_update(now(), &[image], &[]);
        assert!(report.contains("    Health: Unknown\n    Brightness: 128.0/255\n"));
        assert!(!report.contains("Green dominance"));
    }

    #[test]
    fn insights_only_omits_image_section() {
        let report = build_update(now(), &[], &[info(1)]);
        assert!(!report.contains("📸 Image Analysis:"));
        assert!(report.contains("📊 Data Insights:\n  ℹ️ Information:\n    • info 1\n"));
        assert!(!report.contains("Warnings"));
    }

    #[test]
    fn info_lines_are_capped_but_warnings_are_not() {
        let insights = vec![
            info(1),
            warning(1),
            info(2),
            info(3),
            warning(2),
            info(4),
            info(5),
            info(6),
            warning(3),
            info(7),
        ];
        let report = build_update(now(), &[], &insights);

        let bullets: Vec<&str> = report
            .lines()
            .filter_map(|line| line.strip_prefix("    • "))
            .collect();
        assert_eq!(
            bullets,
            vec![
                "warning 1",
                "warning 2",
                "warning 3",
                "info 1",
                "info 2",
                "info 3",
                "info 4",
                "info 5",
            ]
        );
        let warnings_at = report.find("⚠️ Warnings:").unwrap();
        let infos_at = report.find("ℹ️ Information:").unwrap();
        assert!(warnings_at < infos_at);
    }

    #[test]
    fn cold_room_report_end_to_end() {
        let record = parse_record(
            "tent.json",
            r#"{"environment": {"temperature": 15, "humidity": 55}}"#,
        )
        .unwrap();
        let insights = InsightEngine::default().evaluate(&record);
        let report = build_update(now(), &[], &insights);

        let expected = "📊 Data Insights:\n  ⚠️ Warnings:\n    • Temperature is low (15°C). Consider increasing heat.\n\n  ℹ️ Information:\n    • Humidity is good (55%).\n";
        assert!(report.contains(expected));
        assert_eq!(report.matches("    • ").count(), 2);
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let report = build_update(now(), &[analyzed("a.jpg", [10, 10, 10])], &[warning(1)]);
        let header = report.find("Grow Update").unwrap();
        let images = report.find("Image Analysis").unwrap();
        let insights = report.find("Data Insights").unwrap();
        let footer = report.find("#grow #plants").unwrap();
        assert!(header < images && images < insights && insights < footer);
    }

    #[test]
    fn milestone_with_fields() {
        let details = MilestoneDetails::Fields(vec![
            ("day".to_string(), "42".to_string()),
            ("first_pistils".to_string(), "yes".to_string()),
        ]);
        let report = build_milestone(now(), &Milestone::Flowering, Some(&details));

        assert_eq!(
            report,
            "🌸 Flowering Has Begun!\n\nDate: 2026-05-03\n\nDetails:\n  • day: 42\n  • first_pistils: yes\n\n---\n#grow #milestone #flowering\n"
        );
    }

    #[test]
    fn milestone_with_note_and_unknown_kind() {
        let details = MilestoneDetails::Note("First true leaves".to_string());
        let report = build_milestone(
            now(),
            &Milestone::Other("First-Leaves".to_string()),
            Some(&details),
        );

        assert!(report.starts_with("🌱 Growth Milestone!\n"));
        assert!(report.contains("Details:\n  • First true leaves\n"));
        assert!(report.ends_with("#grow #milestone #firstleaves\n"));
    }

    #[test]
    fn milestone_without_details_skips_block() {
        let report = build_milestone(now(), &Milestone::Harvest, None);
        assert!(report.starts_with("🎉 Harvest Time!"));
        assert!(!report.contains("Details:"));
    }

    #[test]
    fn weekly_summary_lists_present_fields_only() {
        let summary = WeeklySummary {
            images_processed: Some(12),
            avg_health: None,
            growth_rate: Some("2.5 cm/week".to_string()),
            notes: Some("Raised the lamp.".to_string()),
        };
        let report = build_weekly_summary(now(), &summary);

        assert_eq!(
            report,
            "📅 Weekly Grow Summary 📅\n\nWeek ending: 2026-05-03\n\n📸 Images processed: 12\n📈 Growth rate: 2.5 cm/week\n\nNotes:\nRaised the lamp.\n\n---\n#grow #weeklysummary #progress\n"
        );
    }

    #[test]
    fn empty_weekly_summary_keeps_frame() {
        let report = build_weekly_summary(now(), &WeeklySummary::default());
        assert!(report.contains("Week ending: 2026-05-03\n\n\n---\n"));
        assert!(!report.contains("Images processed"));
    }
}
