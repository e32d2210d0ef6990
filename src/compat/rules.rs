//! The rule catalog.
//!
//! A fixed, process-wide table of compatibility rules. Each rule names the
//! categories it inspects, its severity and a pure check over a build. Checks
//! are total: a category that is not selected yet produces no finding.

use crate::build::BuildState;
use crate::catalog::types::{same_token, Category, Component};

use super::policy::Thresholds;
use super::types::{Issue, IssueType, RuleInfo, Severity};

/// What a check reports; the rule supplies type and severity.
struct Finding {
    first: (Category, String),
    second: Option<(Category, String)>,
    message: String,
    suggestion: Option<String>,
}

impl Finding {
    fn pair(a: &Component, b: &Component, message: String, suggestion: String) -> Self {
        Self {
            first: (a.category(), a.id.clone()),
            second: Some((b.category(), b.id.clone())),
            message,
            suggestion: Some(suggestion),
        }
    }
}

type Check = fn(&BuildState, &Thresholds) -> Option<Finding>;

/// One compatibility rule.
pub struct Rule {
    pub issue_type: IssueType,
    pub severity: Severity,
    /// Categories the check looks at
    pub categories: &'static [Category],
    /// Categories whose replacement can clear the issue
    pub targets: &'static [Category],
    pub description: &'static str,
    check: Check,
}

impl Rule {
    /// Run the rule against a build.
    pub fn evaluate(&self, build: &BuildState, thresholds: &Thresholds) -> Option<Issue> {
        let finding = (self.check)(build, thresholds)?;
        let (category1, component1) = finding.first;
        let (category2, component2) = match finding.second {
            Some((c, id)) => (Some(c), Some(id)),
            None => (None, None),
        };
        Some(Issue {
            issue_type: self.issue_type,
            severity: self.severity,
            component1,
            component2,
            category1,
            category2,
            message: finding.message,
            suggestion: finding.suggestion,
        })
    }

    /// Whether the rule has something to compare in this build: `target` is
    /// selected and so is at least one other category the rule inspects.
    pub fn applies_to(&self, build: &BuildState, target: Category) -> bool {
        if !self.categories.contains(&target) || !build.has(target) {
            return false;
        }
        self.categories.len() == 1
            || self
                .categories
                .iter()
                .any(|c| *c != target && build.has(*c))
    }

    pub fn info(&self, preferred_target: Option<Category>) -> RuleInfo {
        RuleInfo {
            issue_type: self.issue_type,
            severity: self.severity,
            categories: self.categories.to_vec(),
            targets: self.targets.to_vec(),
            description: self.description,
            preferred_target,
        }
    }
}

/// The rule catalog. Order here has no effect on validator output.
pub static RULES: &[Rule] = &[
    Rule {
        issue_type: IssueType::SocketMismatch,
        severity: Severity::Error,
        categories: &[Category::Cpu, Category::Motherboard],
        targets: &[Category::Cpu, Category::Motherboard],
        description: "CPU socket must match the motherboard socket",
        check: socket_mismatch,
    },
    Rule {
        issue_type: IssueType::RamTypeMismatch,
        severity: Severity::Error,
        categories: &[Category::Ram, Category::Motherboard],
        targets: &[Category::Ram, Category::Motherboard],
        description: "RAM generation must match what the motherboard supports",
        check: ram_type_mismatch,
    },
    Rule {
        issue_type: IssueType::TooManyRamModules,
        severity: Severity::Error,
        categories: &[Category::Ram, Category::Motherboard],
        targets: &[Category::Ram, Category::Motherboard],
        description: "Total RAM modules must fit in the motherboard's slots",
        check: too_many_ram_modules,
    },
    Rule {
        issue_type: IssueType::GpuTooLong,
        severity: Severity::Error,
        categories: &[Category::Gpu, Category::Case],
        targets: &[Category::Gpu, Category::Case],
        description: "GPU must not exceed the case's maximum GPU length",
        check: gpu_too_long,
    },
    Rule {
        issue_type: IssueType::GpuTightFit,
        severity: Severity::Warning,
        categories: &[Category::Gpu, Category::Case],
        targets: &[Category::Gpu, Category::Case],
        description: "GPU fits but leaves less than the recommended clearance",
        check: gpu_tight_fit,
    },
    Rule {
        issue_type: IssueType::CoolerTooTall,
        severity: Severity::Error,
        categories: &[Category::Cooler, Category::Case],
        targets: &[Category::Cooler, Category::Case],
        description: "CPU cooler must not exceed the case's maximum cooler height",
        check: cooler_too_tall,
    },
    Rule {
        issue_type: IssueType::FormFactorMismatch,
        severity: Severity::Error,
        categories: &[Category::Motherboard, Category::Case],
        targets: &[Category::Motherboard, Category::Case],
        description: "Case must support the motherboard form factor",
        check: form_factor_mismatch,
    },
    Rule {
        issue_type: IssueType::MissingPsu,
        severity: Severity::Warning,
        categories: &[Category::Psu, Category::Cpu, Category::Gpu],
        targets: &[Category::Psu],
        description: "A build with a CPU or GPU needs a power supply",
        check: missing_psu,
    },
    Rule {
        issue_type: IssueType::PsuInsufficient,
        severity: Severity::Error,
        categories: &[Category::Psu, Category::Cpu, Category::Gpu],
        targets: &[Category::Psu, Category::Cpu, Category::Gpu],
        description: "PSU wattage must cover estimated system draw",
        check: psu_insufficient,
    },
    Rule {
        issue_type: IssueType::PsuInsufficientForGpu,
        severity: Severity::Error,
        categories: &[Category::Psu, Category::Gpu],
        targets: &[Category::Psu, Category::Gpu],
        description: "PSU wattage must meet the GPU vendor's recommendation",
        check: psu_insufficient_for_gpu,
    },
    Rule {
        issue_type: IssueType::PsuLowHeadroom,
        severity: Severity::Warning,
        categories: &[Category::Psu, Category::Cpu, Category::Gpu],
        targets: &[Category::Psu, Category::Cpu, Category::Gpu],
        description: "PSU covers estimated draw with little headroom",
        check: psu_low_headroom,
    },
];

/// Look up the rule for an issue type.
pub fn rule_for(issue_type: IssueType) -> Option<&'static Rule> {
    RULES.iter().find(|r| r.issue_type == issue_type)
}

/// CPU TDP + GPU TDP + fixed overhead. `None` when neither CPU nor GPU is
/// selected, as there is nothing to power yet.
pub fn estimated_draw(build: &BuildState, thresholds: &Thresholds) -> Option<f64> {
    let cpu = build.cpu().map(|(_, s)| s.tdp_w);
    let gpu = build.gpu().map(|(_, s)| s.tdp_w);
    if cpu.is_none() && gpu.is_none() {
        return None;
    }
    Some(cpu.unwrap_or(0.0) + gpu.unwrap_or(0.0) + thresholds.psu_overhead_w)
}

/// The component a PSU finding is paired with: GPU when present, else CPU.
fn power_consumer(build: &BuildState) -> Option<&Component> {
    build
        .gpu()
        .map(|(c, _)| c)
        .or_else(|| build.cpu().map(|(c, _)| c))
}

fn socket_mismatch(build: &BuildState, _: &Thresholds) -> Option<Finding> {
    let (cpu, cpu_spec) = build.cpu()?;
    let (board, board_spec) = build.motherboard()?;
    if same_token(&cpu_spec.socket, &board_spec.socket) {
        return None;
    }
    Some(Finding::pair(
        cpu,
        board,
        format!(
            "{} uses socket {}, but {} has socket {}",
            cpu.display_name(),
            cpu_spec.socket,
            board.display_name(),
            board_spec.socket
        ),
        format!(
            "Choose a motherboard with a {} socket, or a CPU for {}",
            cpu_spec.socket, board_spec.socket
        ),
    ))
}

fn ram_type_mismatch(build: &BuildState, _: &Thresholds) -> Option<Finding> {
    let (ram, ram_spec) = build.ram()?;
    let (board, board_spec) = build.motherboard()?;
    if same_token(&ram_spec.ram_type, &board_spec.ram_type) {
        return None;
    }
    Some(Finding::pair(
        ram,
        board,
        format!(
            "{} is {} memory, but {} only supports {}",
            ram.display_name(),
            ram_spec.ram_type,
            board.display_name(),
            board_spec.ram_type
        ),
        format!("Choose {} memory for this motherboard", board_spec.ram_type),
    ))
}

fn too_many_ram_modules(build: &BuildState, _: &Thresholds) -> Option<Finding> {
    let (ram, _) = build.ram()?;
    let (board, board_spec) = build.motherboard()?;
    let modules = build.ram_module_count()?;
    if modules <= board_spec.ram_slots {
        return None;
    }
    Some(Finding::pair(
        ram,
        board,
        format!(
            "The build has {} memory modules, but {} has only {} slots",
            modules,
            board.display_name(),
            board_spec.ram_slots
        ),
        format!(
            "Use a kit with at most {} modules in total, or a board with more slots",
            board_spec.ram_slots
        ),
    ))
}

fn gpu_too_long(build: &BuildState, _: &Thresholds) -> Option<Finding> {
    let (gpu, gpu_spec) = build.gpu()?;
    let (case, case_spec) = build.case()?;
    if gpu_spec.length_mm <= case_spec.max_gpu_length_mm {
        return None;
    }
    Some(Finding::pair(
        gpu,
        case,
        format!(
            "{} is {}mm long, but {} fits GPUs up to {}mm",
            gpu.display_name(),
            gpu_spec.length_mm,
            case.display_name(),
            case_spec.max_gpu_length_mm
        ),
        format!(
            "Choose a case that fits GPUs of at least {}mm, or a shorter GPU",
            gpu_spec.length_mm
        ),
    ))
}

fn gpu_tight_fit(build: &BuildState, thresholds: &Thresholds) -> Option<Finding> {
    let (gpu, gpu_spec) = build.gpu()?;
    let (case, case_spec) = build.case()?;
    let clearance = case_spec.max_gpu_length_mm - gpu_spec.length_mm;
    // Negative clearance is gpu_too_long's business.
    if clearance < 0.0 || clearance >= thresholds.gpu_clearance_mm {
        return None;
    }
    Some(Finding::pair(
        gpu,
        case,
        format!(
            "{} fits in {} with only {}mm to spare",
            gpu.display_name(),
            case.display_name(),
            clearance
        ),
        format!(
            "Allow at least {}mm of clearance for cables and airflow",
            thresholds.gpu_clearance_mm
        ),
    ))
}

fn cooler_too_tall(build: &BuildState, _: &Thresholds) -> Option<Finding> {
    let (cooler, cooler_spec) = build.cooler()?;
    let (case, case_spec) = build.case()?;
    if cooler_spec.height_mm <= case_spec.max_cooler_height_mm {
        return None;
    }
    Some(Finding::pair(
        cooler,
        case,
        format!(
            "{} is {}mm tall, but {} fits coolers up to {}mm",
            cooler.display_name(),
            cooler_spec.height_mm,
            case.display_name(),
            case_spec.max_cooler_height_mm
        ),
        format!(
            "Choose a case with at least {}mm of cooler clearance, or a lower-profile cooler",
            cooler_spec.height_mm
        ),
    ))
}

fn form_factor_mismatch(build: &BuildState, _: &Thresholds) -> Option<Finding> {
    let (board, board_spec) = build.motherboard()?;
    let (case, case_spec) = build.case()?;
    let supported = case_spec
        .supported_form_factors
        .iter()
        .any(|ff| same_token(ff, &board_spec.form_factor));
    if supported {
        return None;
    }
    Some(Finding::pair(
        board,
        case,
        format!(
            "{} is {}, but {} supports {}",
            board.display_name(),
            board_spec.form_factor,
            case.display_name(),
            case_spec.supported_form_factors.join(", ")
        ),
        format!("Choose a case that supports {} boards", board_spec.form_factor),
    ))
}

fn missing_psu(build: &BuildState, thresholds: &Thresholds) -> Option<Finding> {
    if build.has(Category::Psu) {
        return None;
    }
    let consumer = power_consumer(build)?;
    let draw = estimated_draw(build, thresholds)?;
    Some(Finding {
        first: (consumer.category(), consumer.id.clone()),
        second: None,
        message: format!(
            "No {} selected; the build is estimated to draw {}W",
            Category::Psu.label(),
            draw
        ),
        suggestion: Some(format!(
            "Add a {} rated for at least {}W",
            Category::Psu.label(),
            draw + thresholds.psu_headroom_w
        )),
    })
}

fn psu_insufficient(build: &BuildState, thresholds: &Thresholds) -> Option<Finding> {
    let (psu, psu_spec) = build.psu()?;
    let consumer = power_consumer(build)?;
    let draw = estimated_draw(build, thresholds)?;
    if psu_spec.wattage_w >= draw {
        return None;
    }
    Some(Finding::pair(
        psu,
        consumer,
        format!(
            "{} provides {}W, but the build is estimated to draw {}W",
            psu.display_name(),
            psu_spec.wattage_w,
            draw
        ),
        format!(
            "Choose a power supply of at least {}W",
            draw + thresholds.psu_headroom_w
        ),
    ))
}

fn psu_insufficient_for_gpu(build: &BuildState, _: &Thresholds) -> Option<Finding> {
    let (psu, psu_spec) = build.psu()?;
    let (gpu, gpu_spec) = build.gpu()?;
    let recommended = gpu_spec.recommended_psu_w?;
    if psu_spec.wattage_w >= recommended {
        return None;
    }
    Some(Finding::pair(
        psu,
        gpu,
        format!(
            "{} provides {}W, but {} recommends at least {}W",
            psu.display_name(),
            psu_spec.wattage_w,
            gpu.display_name(),
            recommended
        ),
        format!("Choose a power supply of at least {}W", recommended),
    ))
}

fn psu_low_headroom(build: &BuildState, thresholds: &Thresholds) -> Option<Finding> {
    let (psu, psu_spec) = build.psu()?;
    let consumer = power_consumer(build)?;
    let draw = estimated_draw(build, thresholds)?;
    let headroom = psu_spec.wattage_w - draw;
    if headroom < 0.0 || headroom >= thresholds.psu_headroom_w {
        return None;
    }
    Some(Finding::pair(
        psu,
        consumer,
        format!(
            "{} leaves only {}W of headroom over the estimated {}W draw",
            psu.display_name(),
            headroom,
            draw
        ),
        format!(
            "A power supply of {}W or more leaves room for load spikes",
            draw + thresholds.psu_headroom_w
        ),
    ))
}
