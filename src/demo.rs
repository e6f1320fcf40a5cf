//! Built-in listing used by `quickapply demo`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::form::{FieldKind, FormField, FormStep};
use crate::posting::JobPosting;
use crate::profile::UserProfile;
use crate::resolver::FieldPolicy;
use crate::scripted::{
    FaultKind, ListingScript, PortCall, ScriptedFault, ScriptedPage, ScriptedPosting,
};

fn field(name: &str, kind: FieldKind, label: &str, options: &[&str]) -> FormField {
    FormField {
        name: name.into(),
        kind,
        label: label.into(),
        required: true,
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

fn posting(id: &str, title: &str, company: &str, description: &str) -> JobPosting {
    JobPosting {
        id: id.into(),
        title: title.into(),
        company: company.into(),
        location: "Remote".into(),
        description: description.into(),
        link: format!("https://www.linkedin.com/jobs/view/{id}/"),
        quick_apply: true,
    }
}

fn entry(posting: JobPosting, steps: Vec<FormStep>) -> ScriptedPosting {
    ScriptedPosting {
        posting,
        steps,
        quick_apply_on_open: true,
        confirms: true,
        faults: Vec::new(),
    }
}

fn contact_step(is_final: bool) -> FormStep {
    FormStep {
        fields: vec![
            field("email", FieldKind::ShortText, "Email address", &[]),
            field("phone", FieldKind::ShortText, "Mobile phone number", &[]),
        ],
        is_final,
    }
}

/// Two pages covering every outcome the session can produce.
pub fn demo_script() -> ListingScript {
    let ferrous = entry(
        posting(
            "4101",
            "Rust Engineer",
            "Ferrous Systems",
            "Work on embedded Rust tooling and compiler qualification.",
        ),
        vec![
            FormStep {
                fields: vec![field("full_name", FieldKind::ShortText, "Full name", &[])],
                is_final: false,
            },
            contact_step(false),
            FormStep {
                fields: vec![
                    field("resume", FieldKind::FileUpload, "Resume", &[]),
                    field("years_experience", FieldKind::ShortText, "Years of Rust experience", &[]),
                ],
                is_final: false,
            },
            FormStep {
                fields: vec![
                    field("work_authorized", FieldKind::Boolean, "Are you authorized to work?", &[]),
                    field("relocate", FieldKind::SingleSelect, "Willing to relocate?", &["Yes", "No"]),
                ],
                is_final: true,
            },
        ],
    );

    let oxide = entry(
        posting(
            "4102",
            "Platform Engineer",
            "Oxide Computer",
            "Build the control plane for rack-scale computers.",
        ),
        vec![FormStep {
            fields: vec![
                field("cover_letter", FieldKind::LongText, "Cover letter", &[]),
                field("phone", FieldKind::ShortText, "Mobile phone number", &[]),
            ],
            is_final: true,
        }],
    );

    let initech = entry(
        posting("4103", "Backend Developer", "Initech", "Maintain the TPS report pipeline."),
        vec![FormStep {
            fields: vec![field("desired_salary", FieldKind::ShortText, "Desired salary", &[])],
            is_final: true,
        }],
    );

    let mut globex = entry(
        posting("4104", "Site Reliability Engineer", "Globex", "Keep things up."),
        vec![contact_step(true)],
    );
    globex.posting.quick_apply = false;

    let mut hooli = entry(
        posting("4105", "Data Engineer", "Hooli", "Compress everything."),
        vec![contact_step(true)],
    );
    hooli.quick_apply_on_open = false;

    let mut umbrella = entry(
        posting("4106", "Systems Engineer", "Umbrella", "Low-latency storage in Rust."),
        vec![contact_step(true)],
    );
    umbrella
        .faults
        .push(ScriptedFault::new(PortCall::Discover, FaultKind::Transient, 1));

    ListingScript {
        pages: vec![
            ScriptedPage {
                postings: vec![ferrous.clone(), oxide, initech, globex, hooli],
                partial: false,
            },
            ScriptedPage {
                postings: vec![ferrous, umbrella],
                partial: true,
            },
        ],
        listing_faults: Vec::new(),
    }
}

/// Profile answering the demo forms when the configured one is empty.
pub fn demo_profile() -> UserProfile {
    UserProfile {
        full_name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "+44 20 7946 0000".into(),
        location: "London".into(),
        fields: BTreeMap::from([("years_experience".to_string(), "7".to_string())]),
        resume_path: Some(PathBuf::from("resume.pdf")),
        summary: Some("Seven years building compilers and storage engines in Rust.".into()),
    }
}

pub fn demo_policy() -> FieldPolicy {
    FieldPolicy {
        boolean_defaults: BTreeMap::from([
            ("work_authorized".to_string(), true),
            ("relocate".to_string(), false),
        ]),
        ..Default::default()
    }
}
