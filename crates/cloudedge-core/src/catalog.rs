//! Product catalog and the pricing/diagnostic tools shown beside the assistant

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Ens,
    Esa,
    Cdn,
    Ena,
}

impl Product {
    pub fn all() -> Vec<Product> {
        vec![Product::Ens, Product::Esa, Product::Cdn, Product::Ena]
    }

    pub fn code(&self) -> &'static str {
        match self {
            Product::Ens => "ENS",
            Product::Esa => "ESA",
            Product::Cdn => "CDN",
            Product::Ena => "ENA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Product::Ens => "Edge Node Service",
            Product::Esa => "Edge Security Acceleration",
            Product::Cdn => "Global Content Delivery",
            Product::Ena => "Edge Network Acceleration",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Product::Ens => "Distributed computing power closer to your users.",
            Product::Esa => "Unified security and acceleration at the edge.",
            Product::Cdn => "Ultra-low latency content distribution network.",
            Product::Ena => "Optimized routing across the global edge backbone.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    EnsCalculator,
    EsaCalculator,
    BestPractices,
    SpeedTest,
}

impl Tool {
    pub fn all() -> Vec<Tool> {
        vec![
            Tool::EnsCalculator,
            Tool::EsaCalculator,
            Tool::BestPractices,
            Tool::SpeedTest,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tool::EnsCalculator => "ENS Pricing Calculator",
            Tool::EsaCalculator => "ESA Pricing Calculator",
            Tool::BestPractices => "ENS Best Practices",
            Tool::SpeedTest => "ENA Network Speed Test",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            Tool::EnsCalculator => "Estimate compute costs",
            Tool::EsaCalculator => "Estimate security and traffic costs",
            Tool::BestPractices => "Deploy edge nodes the right way",
            Tool::SpeedTest => "Check latency to the nearest POP",
        }
    }

    /// The calculator behind this tool, if it is one
    pub fn calculator(&self) -> Option<Calculator> {
        match self {
            Tool::EnsCalculator => Some(Calculator::Ens),
            Tool::EsaCalculator => Some(Calculator::Esa),
            Tool::BestPractices | Tool::SpeedTest => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    ApSoutheast,
    UsWest,
    EuCentral,
    CnEast,
}

impl Region {
    pub fn all() -> Vec<Region> {
        vec![
            Region::ApSoutheast,
            Region::UsWest,
            Region::EuCentral,
            Region::CnEast,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            Region::ApSoutheast => "ap-southeast",
            Region::UsWest => "us-west",
            Region::EuCentral => "eu-central",
            Region::CnEast => "cn-east",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::ApSoutheast => "Asia Pacific (Singapore)",
            Region::UsWest => "US West (California)",
            Region::EuCentral => "Europe (Frankfurt)",
            Region::CnEast => "China East (Shanghai)",
        }
    }

    pub fn next(&self) -> Region {
        let all = Region::all();
        let idx = all.iter().position(|r| r == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calculator {
    /// Priced per node
    Ens,
    /// Priced per TB of traffic
    Esa,
}

impl Calculator {
    /// Monthly on-demand price in USD per unit
    pub fn unit_price(&self) -> u64 {
        match self {
            Calculator::Ens => 120,
            Calculator::Esa => 45,
        }
    }

    pub fn unit_label(&self) -> &'static str {
        match self {
            Calculator::Ens => "Nodes",
            Calculator::Esa => "TB",
        }
    }

    pub fn input_label(&self) -> &'static str {
        match self {
            Calculator::Ens => "Number of Nodes",
            Calculator::Esa => "Traffic Volume (TB)",
        }
    }
}

pub const MIN_UNITS: u32 = 1;
pub const MAX_UNITS: u32 = 100;
pub const DEFAULT_UNITS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceCalculator {
    pub kind: Calculator,
    pub region: Region,
    units: u32,
}

impl PriceCalculator {
    pub fn new(kind: Calculator) -> Self {
        Self {
            kind,
            region: Region::default(),
            units: DEFAULT_UNITS,
        }
    }

    pub fn units(&self) -> u32 {
        self.units
    }

    pub fn set_units(&mut self, units: u32) {
        self.units = units.clamp(MIN_UNITS, MAX_UNITS);
    }

    pub fn increment(&mut self) {
        self.set_units(self.units.saturating_add(1));
    }

    pub fn decrement(&mut self) {
        self.set_units(self.units.saturating_sub(1));
    }

    pub fn cycle_region(&mut self) {
        self.region = self.region.next();
    }

    /// Estimated monthly cost in whole USD. Price does not vary by region.
    pub fn monthly_cost(&self) -> u64 {
        u64::from(self.units) * self.kind.unit_price()
    }
}

/// `1200` -> `"$1,200"`
pub fn format_usd(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn best_practices() -> Vec<&'static str> {
    vec![
        "Place nodes close to end-users to minimize latency. Use the latency map to identify hotspots.",
        "Implement intelligent load balancing policies using ESA to distribute traffic dynamically.",
        "Utilize containerization (Docker/Kubernetes) on ENS instances for rapid deployment and scaling.",
    ]
}
