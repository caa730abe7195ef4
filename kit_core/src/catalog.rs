//! Catalogue of supported training topics and industries.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    pub value: &'static str,
    pub label: &'static str,
    pub description: &'static str
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Industry {
    pub value: &'static str,
    pub label: &'static str
}

pub const TRAINING_TOPICS: &[Topic] = &[
    Topic {
        value: "5s",
        label: "5S Workplace Organization",
        description: "Sort, Set in Order, Shine, Standardize, Sustain"
    },
    Topic {
        value: "value-stream-mapping",
        label: "Value Stream Mapping",
        description: "Visual mapping of material and information flow"
    },
    Topic {
        value: "kaizen",
        label: "Kaizen Events",
        description: "Continuous improvement methodology and events"
    },
    Topic {
        value: "pull-systems",
        label: "Pull Systems",
        description: "Kanban and pull-based production systems"
    },
    Topic {
        value: "waste-elimination",
        label: "Waste Elimination",
        description: "Identifying and eliminating the 8 wastes"
    },
    Topic {
        value: "standardized-work",
        label: "Standardized Work",
        description: "Creating and maintaining work standards"
    },
    Topic {
        value: "visual-management",
        label: "Visual Management",
        description: "Visual controls and management systems"
    },
    Topic {
        value: "poka-yoke",
        label: "Poka-Yoke",
        description: "Error-proofing and mistake prevention"
    }
];

pub const TRAINING_INDUSTRIES: &[Industry] = &[
    Industry {
        value: "manufacturing",
        label: "Manufacturing"
    },
    Industry {
        value: "healthcare",
        label: "Healthcare"
    },
    Industry {
        value: "software",
        label: "Software/Technology"
    },
    Industry {
        value: "logistics",
        label: "Logistics/Supply Chain"
    },
    Industry {
        value: "automotive",
        label: "Automotive"
    },
    Industry {
        value: "food-beverage",
        label: "Food & Beverage"
    },
    Industry {
        value: "aerospace",
        label: "Aerospace"
    },
    Industry {
        value: "pharmaceuticals",
        label: "Pharmaceuticals"
    },
    Industry {
        value: "retail",
        label: "Retail"
    },
    Industry {
        value: "construction",
        label: "Construction"
    },
    Industry {
        value: "financial-services",
        label: "Financial Services"
    },
    Industry {
        value: "education",
        label: "Education"
    },
    Industry {
        value: "government",
        label: "Government"
    },
    Industry {
        value: "other",
        label: "Other"
    }
];

pub fn is_known_topic(value: &str) -> bool {
    TRAINING_TOPICS.iter().any(|t| t.value == value)
}

pub fn is_known_industry(value: &str) -> bool {
    TRAINING_INDUSTRIES.iter().any(|i| i.value == value)
}

/// Display label for a topic value; unknown values are returned unchanged.
pub fn topic_label(value: &str) -> &str {
    TRAINING_TOPICS
        .iter()
        .find(|t| t.value == value)
        .map(|t| t.label)
        .unwrap_or(value)
}
