use serde::Serialize;

/// A job category the candidate can be interviewed for.
#[derive(Debug, Serialize)]
pub struct Role {
    pub key: &'static str,
    pub name: &'static str,
    pub focus: &'static str,
    pub topics: &'static [&'static str],
}

/// Seniority bracket. `difficulty` is fed verbatim into the question prompt.
#[derive(Debug, Serialize)]
pub struct ExperienceLevel {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub difficulty: &'static str,
}

pub const DEFAULT_ROLE_KEY: &str = "1";
pub const DEFAULT_EXPERIENCE_KEY: &str = "1";

pub static ROLES: [Role; 5] = [
    Role {
        key: "1",
        name: "Software Engineer",
        focus: "technical skills, problem-solving, coding concepts, system design, algorithms, data structures",
        topics: &[
            "data structures and algorithms",
            "system design and architecture",
            "databases (SQL and NoSQL)",
            "API design and REST principles",
            "code optimization and performance",
            "version control and Git",
            "debugging and troubleshooting",
            "object-oriented programming",
            "testing and quality assurance",
            "cloud computing and deployment",
        ],
    },
    Role {
        key: "2",
        name: "Sales Representative",
        focus: "communication, persuasion, customer handling, closing techniques",
        topics: &[
            "handling rejection and objections",
            "sales process and methodology",
            "building client relationships",
            "closing techniques",
            "pipeline management",
            "negotiation skills",
            "customer needs analysis",
            "sales metrics and KPIs",
            "competitive positioning",
            "account management",
        ],
    },
    Role {
        key: "3",
        name: "Retail Associate",
        focus: "customer service, problem-solving, teamwork, handling difficult situations",
        topics: &[
            "customer service excellence",
            "handling difficult customers",
            "teamwork and collaboration",
            "time management during busy periods",
            "upselling and cross-selling",
            "product knowledge",
            "conflict resolution",
            "store presentation and merchandising",
            "cash handling and transactions",
            "problem-solving on the spot",
        ],
    },
    Role {
        key: "4",
        name: "Product Manager",
        focus: "product strategy, stakeholder management, prioritization, metrics, technical understanding",
        topics: &[
            "product roadmap and prioritization",
            "stakeholder management",
            "product metrics and KPIs",
            "user research and validation",
            "working with engineering teams",
            "product launch strategy",
            "competitive analysis",
            "technical debt management",
            "feature scoping and trade-offs",
            "data-driven decision making",
        ],
    },
    Role {
        key: "5",
        name: "Data Analyst",
        focus: "analytical thinking, data interpretation, tools/technologies, business impact, SQL, statistics",
        topics: &[
            "SQL and database querying",
            "statistical analysis methods",
            "data cleaning and preparation",
            "data visualization techniques",
            "A/B testing and experimentation",
            "business intelligence tools",
            "communicating insights to stakeholders",
            "predictive modeling",
            "data quality and validation",
            "analytical problem-solving",
        ],
    },
];

pub static EXPERIENCE_LEVELS: [ExperienceLevel; 3] = [
    ExperienceLevel {
        key: "1",
        name: "Fresher or Entry Level",
        description: "0-2 years experience",
        difficulty: "basic concepts, definitions, simple scenarios",
    },
    ExperienceLevel {
        key: "2",
        name: "Mid-Level",
        description: "2-5 years experience",
        difficulty: "practical application, problem-solving, some design",
    },
    ExperienceLevel {
        key: "3",
        name: "Senior",
        description: "5+ years experience",
        difficulty: "complex design, architecture, trade-offs, leadership",
    },
];

pub fn role(key: &str) -> Option<&'static Role> {
    ROLES.iter().find(|r| r.key == key.trim())
}

pub fn experience_level(key: &str) -> Option<&'static ExperienceLevel> {
    EXPERIENCE_LEVELS.iter().find(|e| e.key == key.trim())
}
