//! Message templating.

/// The only placeholder the delivery pipeline substitutes.
pub const EMAIL_PLACEHOLDER: &str = "{{customer_email}}";

/// Renders a message for one recipient. Placeholders other than
/// `{{customer_email}}` are left verbatim — the template author sees their
/// typo in the delivered message instead of a silent blank.
pub fn render_message(template: &str, email: &str) -> String {
    template.replace(EMAIL_PLACEHOLDER, email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_email_placeholder() {
        let out = render_message("Hi {{customer_email}}, 10% off!", "ada@x.io");
        assert_eq!(out, "Hi ada@x.io, 10% off!");
    }

    #[test]
    fn unknown_placeholders_stay_verbatim() {
        let out = render_message("Hi {{first_name}} ({{customer_email}})", "ada@x.io");
        assert_eq!(out, "Hi {{first_name}} (ada@x.io)");
    }

    #[test]
    fn template_without_placeholder_is_untouched() {
        assert_eq!(render_message("Flash sale!", "ada@x.io"), "Flash sale!");
    }
}
