use colored::*;
use std::fmt::Display;
use thrimp_core::client::{CallError, ClientConnectError};
use thrimp_core::registry::SchemaError;
use thrimp_core::schema::{Field, Method, Service};

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct ServiceList(pub Vec<String>);

pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<serde_json::Value> for FormattedString {
    fn from(value: serde_json::Value) -> Self {
        FormattedString(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

impl From<CallError> for FormattedString {
    fn from(err: CallError) -> Self {
        match err {
            CallError::ServiceException { name, value } => FormattedString(format!(
                "{} {}\n\n{}",
                "Call raised".red().bold(),
                name.red().bold(),
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            )),
            err => FormattedString(format!("{}\n\n'{}'", "Call Failed:".red().bold(), err)),
        }
    }
}

impl From<ClientConnectError> for FormattedString {
    fn from(err: ClientConnectError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Connection Error:".red().bold(), err))
    }
}

impl From<SchemaError> for FormattedString {
    fn from(err: SchemaError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Schema Error:".red().bold(), err))
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}:\n\n'{}'", msg.red().bold(), err))
    }
}

impl From<ServiceList> for FormattedString {
    fn from(ServiceList(services): ServiceList) -> Self {
        if services.is_empty() {
            return FormattedString("No services found.".yellow().to_string());
        }

        let mut out = String::new();
        out.push_str("Available Services:\n");
        for svc in services {
            out.push_str(&format!("  - {}\n", svc.green()));
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<&Service> for FormattedString {
    fn from(service: &Service) -> Self {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {{\n",
            "service".blue(),
            service.name.bold()
        ));
        let mut names: Vec<&String> = service.methods.keys().collect();
        names.sort();
        for name in names {
            out.push_str(&format!(
                "  {}\n",
                render_method(&service.methods[name]).green()
            ));
        }
        out.push('}');
        FormattedString(out)
    }
}

impl From<&Method> for FormattedString {
    fn from(method: &Method) -> Self {
        FormattedString(render_method(method).green().to_string())
    }
}

fn render_method(method: &Method) -> String {
    let mut line = format!(
        "{} {}({})",
        method.return_type,
        method.name,
        render_fields(&method.arguments)
    );
    if !method.exceptions.is_empty() {
        line.push_str(&format!(" throws ({})", render_fields(&method.exceptions)));
    }
    line
}

fn render_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| {
            let requiredness = if field.optional { "optional " } else { "" };
            format!("{}: {}{} {}", field.id, requiredness, field.ty, field.name)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
