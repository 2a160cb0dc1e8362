//! Confirmation email content.

use handlebars::html_escape;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub const CONFIRMATION_SUBJECT: &str = "Registration Confirmed";

/// Renders the registration confirmation for `full_name`. The name is
/// HTML-escaped in the HTML part only.
pub fn confirmation_email(full_name: &str) -> RenderedEmail {
    let html = format!(
        "<h1>Welcome, {}!</h1>\n\
         <p>Your registration has been received successfully.</p>\n\
         <p>Thank you for registering with us.</p>",
        html_escape(full_name)
    );
    let text = format!(
        "Welcome, {}!\n\n\
         Your registration has been received successfully.\n\n\
         Thank you for registering with us.\n",
        full_name
    );

    RenderedEmail {
        subject: CONFIRMATION_SUBJECT.to_string(),
        html,
        text,
    }
}
