use super::ui;
use crate::core::fund::FundDataProvider;
use comfy_table::Cell;
use tracing::info;

/// Searches the fund catalogue and prints matches as a table.
pub async fn run(provider: &dyn FundDataProvider, query: &str, limit: usize) -> anyhow::Result<()> {
    info!(query, limit, "Searching funds");

    let pb = ui::new_spinner("Searching funds...");
    let results = provider.search_funds(query, limit).await;
    pb.finish_and_clear();

    if results.is_empty() {
        println!("No funds found matching '{query}'.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Scheme Code"),
        ui::header_cell("Scheme Name"),
        ui::header_cell("Fund House"),
        ui::header_cell("Category"),
    ]);

    for fund in &results {
        table.add_row(vec![
            Cell::new(&fund.scheme_code),
            Cell::new(&fund.scheme_name),
            ui::format_optional_cell(fund.fund_house.as_deref(), |h| h.to_string()),
            ui::format_optional_cell(fund.category.as_deref(), |c| c.to_string()),
        ]);
    }

    println!(
        "\n{}",
        ui::style_text(&format!("Funds matching '{query}'"), ui::StyleType::Title)
    );
    println!("{table}");
    println!(
        "{}",
        ui::style_text(&format!("{} result(s)", results.len()), ui::StyleType::Subtle)
    );
    Ok(())
}
