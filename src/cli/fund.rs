use super::ui;
use crate::core::fund::{FundDataProvider, FundDetail, Horizon};
use comfy_table::Cell;
use tracing::info;

/// Fetches one scheme and prints its metadata and trailing returns.
pub async fn run(
    provider: &dyn FundDataProvider,
    scheme_code: &str,
    show_history: bool,
) -> anyhow::Result<()> {
    info!(scheme_code, "Fetching fund details");

    let pb = ui::new_spinner("Fetching fund details...");
    let detail = provider.fund_details(scheme_code, show_history).await;
    pb.finish_and_clear();

    let Some(detail) = detail else {
        println!(
            "{}",
            ui::style_text(
                &format!("No fund found for scheme code {scheme_code}."),
                ui::StyleType::Error
            )
        );
        return Ok(());
    };

    print_detail(&detail, show_history);
    Ok(())
}

fn print_detail(detail: &FundDetail, show_history: bool) {
    println!(
        "\n{}",
        ui::style_text(&detail.scheme_name, ui::StyleType::Title)
    );

    let mut table = ui::new_styled_table();
    table.add_row(vec![Cell::new("Scheme Code"), Cell::new(&detail.scheme_code)]);
    table.add_row(vec![
        Cell::new("Fund House"),
        ui::format_optional_cell(detail.fund_house.as_deref(), |h| h.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Type"),
        ui::format_optional_cell(detail.scheme_type.as_deref(), |t| t.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Category"),
        ui::format_optional_cell(detail.scheme_category.as_deref(), |c| c.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Latest NAV"),
        ui::format_optional_cell(detail.latest_nav, |n| format!("{n:.4}")),
    ]);
    table.add_row(vec![
        Cell::new("NAV Date"),
        ui::format_optional_cell(detail.latest_nav_date, |d| d.format("%Y-%m-%d").to_string()),
    ]);
    println!("{table}");

    if detail.returns.is_empty() {
        println!(
            "{}",
            ui::style_text("No trailing returns available.", ui::StyleType::Subtle)
        );
    } else {
        let mut returns_table = ui::new_styled_table();
        returns_table.set_header(
            Horizon::ALL
                .iter()
                .filter(|h| detail.returns.contains_key(h))
                .map(|h| ui::header_cell(&h.to_string()))
                .collect::<Vec<_>>(),
        );
        returns_table.add_row(
            Horizon::ALL
                .iter()
                .filter_map(|h| detail.returns.get(h))
                .map(|r| ui::return_cell(*r))
                .collect::<Vec<_>>(),
        );
        println!("{returns_table}");
    }

    if show_history
        && let Some(history) = &detail.nav_history
    {
        println!(
            "{}",
            ui::style_text(
                &format!("{} NAV observations (newest first)", history.len()),
                ui::StyleType::Subtle
            )
        );
        let mut history_table = ui::new_styled_table();
        history_table.set_header(vec![ui::header_cell("Date"), ui::header_cell("NAV")]);
        for point in history.iter().take(10) {
            history_table.add_row(vec![
                Cell::new(point.date.format("%Y-%m-%d").to_string()),
                Cell::new(format!("{:.4}", point.nav)),
            ]);
        }
        println!("{history_table}");
    }
}
