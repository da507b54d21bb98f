// src/mitigation.rs - Mitigation strategy catalogue keyed by risk level

use std::collections::BTreeMap;

use serde::Serialize;

use crate::risk::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CostRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    pub title: &'static str,
    pub description: &'static str,
    /// Cost as quoted, e.g. "Medium ($3,000-10,000)"
    pub cost: &'static str,
    /// USD bounds; `None` for administrative-only costs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<CostRange>,
    pub timeline: &'static str,
    pub priority: &'static str,
    pub effectiveness: &'static str,
    pub implementation_steps: &'static [&'static str],
}

const fn usd(min: u64, max: u64) -> Option<CostRange> {
    Some(CostRange { min, max })
}

static MINIMAL: [Strategy; 3] = [
    Strategy {
        title: "Preventive Monitoring",
        description: "Implement regular water quality monitoring to detect early signs of nutrient enrichment or algae growth before problems develop.",
        cost: "Low ($500-1,500/month)",
        cost_usd: usd(500, 1_500),
        timeline: "Ongoing",
        priority: "Medium",
        effectiveness: "High for prevention",
        implementation_steps: &[
            "Set up monthly water sampling schedule",
            "Monitor key parameters: chlorophyll-a, nutrients, turbidity",
            "Establish baseline water quality data",
            "Train local staff in basic water quality assessment",
        ],
    },
    Strategy {
        title: "Nutrient Source Control",
        description: "Identify and minimize nutrient inputs from agricultural runoff, sewage, and other pollution sources in the watershed.",
        cost: "Medium ($2,000-8,000)",
        cost_usd: usd(2_000, 8_000),
        timeline: "3-6 months",
        priority: "Medium",
        effectiveness: "Very High",
        implementation_steps: &[
            "Conduct watershed pollution source survey",
            "Implement best management practices for agriculture",
            "Upgrade sewage collection and treatment systems",
            "Create buffer zones around water bodies",
        ],
    },
    Strategy {
        title: "Community Education",
        description: "Educate local communities about activities that contribute to algae growth and promote water-friendly practices.",
        cost: "Low ($1,000-3,000)",
        cost_usd: usd(1_000, 3_000),
        timeline: "2-4 weeks",
        priority: "Medium",
        effectiveness: "Medium-High",
        implementation_steps: &[
            "Develop educational materials in local languages",
            "Conduct community workshops",
            "Partner with local schools for awareness programs",
            "Create signage around water bodies",
        ],
    },
];

static LOW: [Strategy; 4] = [
    Strategy {
        title: "Enhanced Monitoring Program",
        description: "Increase monitoring frequency and add advanced parameters to track water quality trends and detect early warning signs.",
        cost: "Medium ($3,000-6,000/month)",
        cost_usd: usd(3_000, 6_000),
        timeline: "Immediate implementation",
        priority: "High",
        effectiveness: "High",
        implementation_steps: &[
            "Increase sampling frequency to bi-weekly",
            "Add satellite imagery monitoring",
            "Install automated water quality sensors",
            "Establish early warning thresholds",
        ],
    },
    Strategy {
        title: "Watershed Management",
        description: "Implement comprehensive watershed management practices to reduce nutrient loading and improve water quality.",
        cost: "High ($10,000-25,000)",
        cost_usd: usd(10_000, 25_000),
        timeline: "6-12 months",
        priority: "High",
        effectiveness: "Very High",
        implementation_steps: &[
            "Develop watershed management plan",
            "Implement erosion control measures",
            "Establish riparian buffer zones",
            "Regulate agricultural chemical use",
        ],
    },
    Strategy {
        title: "Aeration Systems",
        description: "Install mechanical aeration systems to increase dissolved oxygen levels and prevent anaerobic conditions that promote algae growth.",
        cost: "Medium ($5,000-15,000)",
        cost_usd: usd(5_000, 15_000),
        timeline: "1-3 months",
        priority: "Medium",
        effectiveness: "Medium-High",
        implementation_steps: &[
            "Assess water body size and depth",
            "Select appropriate aeration technology",
            "Install and commission aeration systems",
            "Monitor dissolved oxygen levels regularly",
        ],
    },
    Strategy {
        title: "Biological Controls",
        description: "Introduce beneficial microorganisms or aquatic plants that compete with algae for nutrients.",
        cost: "Low-Medium ($2,000-8,000)",
        cost_usd: usd(2_000, 8_000),
        timeline: "2-6 months",
        priority: "Low",
        effectiveness: "Medium",
        implementation_steps: &[
            "Study ecosystem compatibility",
            "Select appropriate biological agents",
            "Implement pilot program",
            "Monitor ecosystem response",
        ],
    },
];

static MEDIUM: [Strategy; 5] = [
    Strategy {
        title: "Immediate Water Use Restrictions",
        description: "Implement temporary restrictions on water use for drinking, recreation, and agriculture until algae levels decrease.",
        cost: "Low (administrative costs)",
        cost_usd: None,
        timeline: "Immediate",
        priority: "Critical",
        effectiveness: "High for public safety",
        implementation_steps: &[
            "Issue public health advisory",
            "Restrict recreational water activities",
            "Provide alternative water sources",
            "Post warning signs at water access points",
        ],
    },
    Strategy {
        title: "Chemical Treatment",
        description: "Apply approved algaecides or other chemical treatments to reduce existing algae populations while addressing root causes.",
        cost: "Medium ($3,000-10,000)",
        cost_usd: usd(3_000, 10_000),
        timeline: "1-2 weeks",
        priority: "High",
        effectiveness: "High (short-term)",
        implementation_steps: &[
            "Obtain necessary permits for chemical treatment",
            "Select appropriate algaecide for local conditions",
            "Apply treatment according to manufacturer guidelines",
            "Monitor treatment effectiveness and side effects",
        ],
    },
    Strategy {
        title: "Nutrient Precipitation",
        description: "Use chemical precipitation to remove excess phosphorus from the water column and sediments.",
        cost: "High ($8,000-20,000)",
        cost_usd: usd(8_000, 20_000),
        timeline: "2-4 weeks",
        priority: "High",
        effectiveness: "High",
        implementation_steps: &[
            "Conduct water chemistry analysis",
            "Select appropriate precipitation agent (alum, iron salts)",
            "Calculate required dosage",
            "Apply treatment and monitor results",
        ],
    },
    Strategy {
        title: "Sediment Removal",
        description: "Remove nutrient-rich sediments that serve as internal nutrient source for algae growth.",
        cost: "Very High ($20,000-50,000)",
        cost_usd: usd(20_000, 50_000),
        timeline: "3-6 months",
        priority: "Medium",
        effectiveness: "Very High (long-term)",
        implementation_steps: &[
            "Assess sediment nutrient content",
            "Obtain environmental permits",
            "Contract specialized dredging equipment",
            "Properly dispose of removed sediments",
        ],
    },
    Strategy {
        title: "Alternative Water Supply",
        description: "Establish temporary alternative water sources for critical uses while treating the affected water body.",
        cost: "High ($10,000-30,000)",
        cost_usd: usd(10_000, 30_000),
        timeline: "1-4 weeks",
        priority: "High",
        effectiveness: "High for continuity",
        implementation_steps: &[
            "Identify alternative water sources",
            "Install temporary distribution systems",
            "Ensure water quality meets standards",
            "Coordinate with local authorities",
        ],
    },
];

static HIGH: [Strategy; 6] = [
    Strategy {
        title: "Emergency Response Activation",
        description: "Activate emergency response protocols and notify all relevant authorities and affected communities immediately.",
        cost: "Low (administrative)",
        cost_usd: None,
        timeline: "Immediate (within 24 hours)",
        priority: "Critical",
        effectiveness: "Essential for safety",
        implementation_steps: &[
            "Activate emergency response team",
            "Notify health authorities and media",
            "Issue public health emergency declaration",
            "Coordinate with disaster management agencies",
        ],
    },
    Strategy {
        title: "Complete Water Access Prohibition",
        description: "Prohibit all human and animal contact with water until algae toxin levels return to safe ranges.",
        cost: "Medium ($5,000-15,000 for enforcement)",
        cost_usd: usd(5_000, 15_000),
        timeline: "Immediate",
        priority: "Critical",
        effectiveness: "Essential",
        implementation_steps: &[
            "Install physical barriers at access points",
            "Deploy security personnel if necessary",
            "Issue legal notices and penalties",
            "Provide emergency alternative water sources",
        ],
    },
    Strategy {
        title: "Intensive Chemical Treatment",
        description: "Apply intensive multi-phase chemical treatment including algaecides, coagulants, and oxidizers.",
        cost: "Very High ($15,000-40,000)",
        cost_usd: usd(15_000, 40_000),
        timeline: "1-3 weeks",
        priority: "Critical",
        effectiveness: "High",
        implementation_steps: &[
            "Engage specialized treatment contractors",
            "Implement staged treatment protocol",
            "Monitor treatment progress daily",
            "Test for harmful byproducts",
        ],
    },
    Strategy {
        title: "Water Body Isolation",
        description: "Physically isolate affected water body to prevent spread of algae and toxins to connected water systems.",
        cost: "High ($20,000-60,000)",
        cost_usd: usd(20_000, 60_000),
        timeline: "1-2 weeks",
        priority: "High",
        effectiveness: "High for containment",
        implementation_steps: &[
            "Install temporary barriers or dams",
            "Divert clean water sources",
            "Implement bypass systems",
            "Monitor downstream water quality",
        ],
    },
    Strategy {
        title: "Emergency Water Treatment Plant",
        description: "Install temporary advanced water treatment facilities to provide safe water for essential needs.",
        cost: "Very High ($50,000-150,000)",
        cost_usd: usd(50_000, 150_000),
        timeline: "2-6 weeks",
        priority: "High",
        effectiveness: "High",
        implementation_steps: &[
            "Deploy mobile treatment units",
            "Install advanced filtration systems",
            "Implement multi-barrier treatment approach",
            "Establish quality control laboratory",
        ],
    },
    Strategy {
        title: "Ecosystem Restoration",
        description: "Begin immediate ecosystem restoration to address fundamental causes of severe algae blooms.",
        cost: "Very High ($75,000-200,000)",
        cost_usd: usd(75_000, 200_000),
        timeline: "6-24 months",
        priority: "Medium (long-term)",
        effectiveness: "Very High (sustainable)",
        implementation_steps: &[
            "Conduct comprehensive ecosystem assessment",
            "Develop restoration master plan",
            "Implement habitat restoration projects",
            "Establish long-term monitoring program",
        ],
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencyProtocol {
    pub first_24_hours: &'static [&'static str],
    pub first_week: &'static [&'static str],
}

pub static EMERGENCY_PROTOCOL: EmergencyProtocol = EmergencyProtocol {
    first_24_hours: &[
        "Assess algae bloom extent and severity",
        "Collect water samples for toxin analysis",
        "Issue public health advisory",
        "Restrict water access and use",
        "Notify relevant authorities",
        "Activate emergency response team",
    ],
    first_week: &[
        "Implement emergency treatment measures",
        "Establish alternative water sources",
        "Continue monitoring and assessment",
        "Coordinate media communications",
        "Begin investigation of causes",
    ],
};

pub fn strategies_for(level: RiskLevel) -> &'static [Strategy] {
    match level {
        RiskLevel::Minimal => &MINIMAL,
        RiskLevel::Low => &LOW,
        RiskLevel::Medium => &MEDIUM,
        RiskLevel::High => &HIGH,
    }
}

/// Lookup by level name; unrecognised names get the Medium list
pub fn strategies_for_label(label: &str) -> &'static [Strategy] {
    let level = match label.trim() {
        "Minimal" => RiskLevel::Minimal,
        "Low" => RiskLevel::Low,
        "High" => RiskLevel::High,
        _ => RiskLevel::Medium,
    };
    strategies_for(level)
}

fn all_strategies() -> impl Iterator<Item = &'static Strategy> {
    MINIMAL.iter().chain(LOW.iter()).chain(MEDIUM.iter()).chain(HIGH.iter())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub total: CostRange,
    pub average: u64,
    pub breakdown: BTreeMap<String, CostRange>,
}

/// Sums the USD bounds of the named strategies; titles without a dollar figure add nothing
pub fn estimate_cost<S: AsRef<str>>(titles: &[S]) -> CostEstimate {
    let mut total = CostRange { min: 0, max: 0 };
    let mut breakdown = BTreeMap::new();

    for strategy in all_strategies() {
        if !titles.iter().any(|t| t.as_ref() == strategy.title) {
            continue;
        }
        if let Some(range) = strategy.cost_usd {
            total.min += range.min;
            total.max += range.max;
            breakdown.insert(strategy.title.to_string(), range);
        }
    }

    CostEstimate {
        total,
        average: (total.min + total.max) / 2,
        breakdown,
    }
}

/// Strategies, their combined cost and, for high risk, the emergency checklist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MitigationPlan {
    pub risk_level: RiskLevel,
    pub strategies: &'static [Strategy],
    pub estimated_cost: CostEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_protocol: Option<&'static EmergencyProtocol>,
}

impl MitigationPlan {
    pub fn for_level(level: RiskLevel) -> Self {
        let strategies = strategies_for(level);
        let titles: Vec<&str> = strategies.iter().map(|s| s.title).collect();

        Self {
            risk_level: level,
            strategies,
            estimated_cost: estimate_cost(&titles),
            emergency_protocol: (level == RiskLevel::High).then_some(&EMERGENCY_PROTOCOL),
        }
    }
}
