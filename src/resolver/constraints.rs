//! Catalog query derivation.
//!
//! A replacement for `target` has to fit everything else in the build, so
//! each constraint is read off the other selected parts. A constraint whose
//! source part is not selected is simply left out.
//!
//! Margin issues (`gpu_tight_fit`, `psu_low_headroom`) fire on parts that
//! already fit, so for those the bound includes the policy margin. The
//! catalog limit applies before re-validation and a bare fit bound would
//! let parts that leave the issue in place crowd out ones that clear it.

use serde_json::json;

use crate::build::BuildState;
use crate::catalog::types::{CatalogQuery, Category, Predicate};
use crate::compat::{estimated_draw, IssueType, Thresholds};

/// Build the catalog query for replacing `target` in `build` to clear an
/// issue of type `issue_type`.
pub fn derive_query(
    issue_type: IssueType,
    target: Category,
    build: &BuildState,
    thresholds: &Thresholds,
    limit: usize,
) -> CatalogQuery {
    let query = CatalogQuery::new(target, limit);
    let margins = Margins::for_issue(issue_type, thresholds);
    match target {
        Category::Motherboard => motherboard_query(query, build),
        Category::Cpu => cpu_query(query, build, thresholds, margins),
        Category::Ram => ram_query(query, build),
        Category::Gpu => gpu_query(query, build, thresholds, margins),
        Category::Psu => psu_query(query, build, thresholds, margins),
        Category::Case => case_query(query, build, margins),
        Category::Cooler => cooler_query(query, build),
        Category::Storage => query,
    }
}

/// Extra slack a replacement must leave, on top of merely fitting.
#[derive(Debug, Clone, Copy, Default)]
struct Margins {
    gpu_length_mm: f64,
    power_w: f64,
}

impl Margins {
    fn for_issue(issue_type: IssueType, thresholds: &Thresholds) -> Self {
        match issue_type {
            IssueType::GpuTightFit => Self {
                gpu_length_mm: thresholds.gpu_clearance_mm,
                ..Self::default()
            },
            IssueType::PsuLowHeadroom => Self {
                power_w: thresholds.psu_headroom_w,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

fn motherboard_query(mut query: CatalogQuery, build: &BuildState) -> CatalogQuery {
    if let Some((_, cpu)) = build.cpu() {
        query = query.with("socket", Predicate::Eq(json!(cpu.socket)));
    }
    if let Some((_, ram)) = build.ram() {
        query = query.with("ram_type", Predicate::Eq(json!(ram.ram_type)));
    }
    if let Some(modules) = build.ram_module_count() {
        query = query.with("ram_slots", Predicate::Min(f64::from(modules)));
    }
    if let Some((_, case)) = build.case() {
        query = query.with(
            "form_factor",
            Predicate::OneOf(case.supported_form_factors.clone()),
        );
    }
    query
}

fn cpu_query(mut query: CatalogQuery, build: &BuildState, thresholds: &Thresholds, margins: Margins) -> CatalogQuery {
    if let Some((_, board)) = build.motherboard() {
        query = query.with("socket", Predicate::Eq(json!(board.socket)));
    }
    if let Some((_, psu)) = build.psu() {
        let gpu_draw = build.gpu().map(|(_, g)| g.tdp_w).unwrap_or(0.0);
        let budget = psu.wattage_w - gpu_draw - thresholds.psu_overhead_w - margins.power_w;
        query = query.with("tdp_w", Predicate::Max(budget));
    }
    query
}

fn ram_query(mut query: CatalogQuery, build: &BuildState) -> CatalogQuery {
    if let Some((_, board)) = build.motherboard() {
        query = query.with("ram_type", Predicate::Eq(json!(board.ram_type)));
        let per_kit = board.ram_slots / build.ram_quantity().max(1);
        query = query.with("modules", Predicate::Max(f64::from(per_kit)));
    }
    query
}

fn gpu_query(mut query: CatalogQuery, build: &BuildState, thresholds: &Thresholds, margins: Margins) -> CatalogQuery {
    if let Some((_, case)) = build.case() {
        query = query.with(
            "length_mm",
            Predicate::Max(case.max_gpu_length_mm - margins.gpu_length_mm),
        );
    }
    if let Some((_, psu)) = build.psu() {
        let cpu_draw = build.cpu().map(|(_, c)| c.tdp_w).unwrap_or(0.0);
        let budget = psu.wattage_w - cpu_draw - thresholds.psu_overhead_w - margins.power_w;
        query = query.with("tdp_w", Predicate::Max(budget));
    }
    query
}

fn psu_query(query: CatalogQuery, build: &BuildState, thresholds: &Thresholds, margins: Margins) -> CatalogQuery {
    let recommended = build.gpu().and_then(|(_, g)| g.recommended_psu_w);
    let draw = estimated_draw(build, thresholds).map(|d| d + margins.power_w);
    let floor = match (draw, recommended) {
        (Some(draw), Some(rec)) => Some(draw.max(rec)),
        (draw, rec) => draw.or(rec),
    };
    match floor {
        Some(watts) => query.with("wattage_w", Predicate::Min(watts)),
        None => query,
    }
}

fn case_query(mut query: CatalogQuery, build: &BuildState, margins: Margins) -> CatalogQuery {
    if let Some((_, gpu)) = build.gpu() {
        query = query.with(
            "max_gpu_length_mm",
            Predicate::Min(gpu.length_mm + margins.gpu_length_mm),
        );
    }
    if let Some((_, cooler)) = build.cooler() {
        query = query.with("max_cooler_height_mm", Predicate::Min(cooler.height_mm));
    }
    if let Some((_, board)) = build.motherboard() {
        query = query.with(
            "supported_form_factors",
            Predicate::Contains(board.form_factor.clone()),
        );
    }
    query
}

fn cooler_query(mut query: CatalogQuery, build: &BuildState) -> CatalogQuery {
    if let Some((_, case)) = build.case() {
        query = query.with("height_mm", Predicate::Max(case.max_cooler_height_mm));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::test_parts::*;
    use crate::compat::default_policy;

    fn thresholds() -> Thresholds {
        default_policy().thresholds
    }

    #[test]
    fn test_empty_build_gives_bare_query() {
        for category in Category::ALL {
            let query = derive_query(IssueType::SocketMismatch, category, &BuildState::new(), &thresholds(), 25);
            assert_eq!(query.category, category);
            assert!(query.constraints.is_empty(), "{} had constraints", category);
            assert_eq!(query.limit, 25);
        }
    }

    #[test]
    fn test_motherboard_constraints() {
        let build = BuildState::new()
            .select(cpu("cpu-1", "AM5", 105.0))
            .unwrap()
            .select(ram("ram-1", "DDR5", 2))
            .unwrap()
            .with_ram_quantity(2)
            .unwrap()
            .select(case("case-1", 400.0, 170.0, &["ATX", "mATX"]))
            .unwrap();
        let query = derive_query(IssueType::SocketMismatch, Category::Motherboard, &build, &thresholds(), 25);
        assert_eq!(query.constraints["socket"], Predicate::Eq(json!("AM5")));
        assert_eq!(query.constraints["ram_type"], Predicate::Eq(json!("DDR5")));
        assert_eq!(query.constraints["ram_slots"], Predicate::Min(4.0));
        assert_eq!(
            query.constraints["form_factor"],
            Predicate::OneOf(vec!["ATX".to_string(), "mATX".to_string()])
        );
    }

    #[test]
    fn test_ram_constraints_split_slots_per_kit() {
        let build = BuildState::new()
            .select(motherboard("mb-1", "AM5", "DDR5", "ATX", 4))
            .unwrap()
            .with_ram_quantity(3)
            .unwrap();
        let query = derive_query(IssueType::RamTypeMismatch, Category::Ram, &build, &thresholds(), 25);
        assert_eq!(query.constraints["ram_type"], Predicate::Eq(json!("DDR5")));
        assert_eq!(query.constraints["modules"], Predicate::Max(1.0));
    }

    #[test]
    fn test_power_budgets() {
        let build = BuildState::new()
            .select(cpu("cpu-1", "AM5", 120.0))
            .unwrap()
            .select(gpu("gpu-1", 300.0, 320.0, Some(850.0)))
            .unwrap()
            .select(psu("psu-1", 750.0))
            .unwrap();
        let t = thresholds();

        let gpu_query = derive_query(IssueType::PsuInsufficient, Category::Gpu, &build, &t, 25);
        assert_eq!(gpu_query.constraints["tdp_w"], Predicate::Max(750.0 - 120.0 - 150.0));

        let cpu_query = derive_query(IssueType::PsuInsufficient, Category::Cpu, &build, &t, 25);
        assert_eq!(cpu_query.constraints["tdp_w"], Predicate::Max(750.0 - 320.0 - 150.0));

        // The GPU recommendation beats the 590 W estimate.
        let psu_query = derive_query(IssueType::PsuInsufficientForGpu, Category::Psu, &build, &t, 25);
        assert_eq!(psu_query.constraints["wattage_w"], Predicate::Min(850.0));
    }

    #[test]
    fn test_psu_floor_from_draw_alone() {
        let build = BuildState::new().select(cpu("cpu-1", "AM5", 200.0)).unwrap();
        let query = derive_query(IssueType::MissingPsu, Category::Psu, &build, &thresholds(), 25);
        assert_eq!(query.constraints["wattage_w"], Predicate::Min(350.0));
    }

    #[test]
    fn test_case_constraints() {
        let build = BuildState::new()
            .select(gpu("gpu-1", 336.0, 300.0, None))
            .unwrap()
            .select(cooler("cooler-1", 158.0))
            .unwrap()
            .select(motherboard("mb-1", "AM5", "DDR5", "ATX", 4))
            .unwrap();
        let query = derive_query(IssueType::GpuTooLong, Category::Case, &build, &thresholds(), 25);
        assert_eq!(query.constraints["max_gpu_length_mm"], Predicate::Min(336.0));
        assert_eq!(query.constraints["max_cooler_height_mm"], Predicate::Min(158.0));
        assert_eq!(
            query.constraints["supported_form_factors"],
            Predicate::Contains("ATX".to_string())
        );
    }

    #[test]
    fn test_cooler_constraint() {
        let build = BuildState::new()
            .select(case("case-1", 400.0, 165.0, &["ATX"]))
            .unwrap();
        let query = derive_query(IssueType::CoolerTooTall, Category::Cooler, &build, &thresholds(), 25);
        assert_eq!(query.constraints["height_mm"], Predicate::Max(165.0));
    }

    #[test]
    fn test_margin_issues_require_the_margin() {
        let t = thresholds();
        let build = BuildState::new()
            .select(cpu("cpu-1", "AM5", 125.0))
            .unwrap()
            .select(gpu("gpu-1", 360.0, 450.0, None))
            .unwrap()
            .select(psu("psu-1", 750.0))
            .unwrap()
            .select(case("case-1", 365.0, 170.0, &["ATX"]))
            .unwrap();

        // 125 + 450 + 150 = 725 W draw, plus 100 W headroom.
        let psu_query = derive_query(IssueType::PsuLowHeadroom, Category::Psu, &build, &t, 25);
        assert_eq!(psu_query.constraints["wattage_w"], Predicate::Min(825.0));
        let cpu_query = derive_query(IssueType::PsuLowHeadroom, Category::Cpu, &build, &t, 25);
        assert_eq!(cpu_query.constraints["tdp_w"], Predicate::Max(750.0 - 450.0 - 150.0 - 100.0));

        let case_query = derive_query(IssueType::GpuTightFit, Category::Case, &build, &t, 25);
        assert_eq!(case_query.constraints["max_gpu_length_mm"], Predicate::Min(370.0));
        let gpu_query = derive_query(IssueType::GpuTightFit, Category::Gpu, &build, &t, 25);
        assert_eq!(gpu_query.constraints["length_mm"], Predicate::Max(355.0));

        // Other issues only ask for a fit.
        let plain = derive_query(IssueType::GpuTooLong, Category::Case, &build, &t, 25);
        assert_eq!(plain.constraints["max_gpu_length_mm"], Predicate::Min(360.0));
    }
}
