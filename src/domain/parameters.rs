// Splits inbound report query parameters into control parameters and template variables
use super::variables::Variables;

/// Parameters consumed by the reporter itself and never forwarded to panel requests.
pub const CONTROL_PARAMETERS: [&str; 9] = [
    "dashUid",
    "theme",
    "layout",
    "orientation",
    "from",
    "to",
    "panelId",
    "access_id",
    "orgId",
];

pub fn is_control_parameter(name: &str) -> bool {
    CONTROL_PARAMETERS.contains(&name)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedParameters {
    pub control: Variables,
    pub template_variables: Variables,
}

/// Anything not in the control set is a template variable, known or not.
pub fn classify(params: &Variables) -> ClassifiedParameters {
    let mut classified = ClassifiedParameters::default();
    for (name, value) in params.iter() {
        if is_control_parameter(name) {
            classified.control.add(name, value);
        } else {
            classified.template_variables.add(name, value);
        }
    }
    classified
}
