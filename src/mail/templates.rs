//! Named HTML mail templates rendered from data.

/// Site name shown in mail bodies and the From header.
pub const SITE_NAME: &str = "Forgepoint Studio";

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A named mail template plus the data it renders with.
#[derive(Debug, Clone)]
pub enum Template {
    /// Password-reset link for an admin. The link carries the raw token.
    PasswordReset { reset_link: String },
    /// Confirmation that an admin's password was changed.
    PasswordChanged { name: String },
    /// Internal notification about a new enquiry.
    EnquiryNotification {
        name: String,
        email: String,
        phone: String,
        company: String,
        message: String,
    },
    /// Acknowledgement sent back to the person who enquired.
    EnquiryAck { name: String },
    /// Welcome mail for a fresh newsletter subscriber.
    NewsletterWelcome,
    /// Voucher broadcast sent to every subscriber.
    Voucher {
        title: String,
        heading: String,
        message: String,
        images: Vec<String>,
        website_url: String,
        unsubscribe_url: String,
    },
    /// Notification that an admin account was removed.
    AccountRemoved { name: String },
}

impl Template {
    /// Short name used in delivery logs.
    pub fn name(&self) -> &'static str {
        match self {
            Template::PasswordReset { .. } => "password_reset",
            Template::PasswordChanged { .. } => "password_changed",
            Template::EnquiryNotification { .. } => "enquiry",
            Template::EnquiryAck { .. } => "enquiry_ack",
            Template::NewsletterWelcome => "newsletter_welcome",
            Template::Voucher { .. } => "voucher",
            Template::AccountRemoved { .. } => "account_removed",
        }
    }

    /// Render the template into an HTML document body.
    pub fn render(&self) -> String {
        match self {
            Template::PasswordReset { reset_link } => format!(
                "<html><body>\
                 <h2>Reset your {site} password</h2>\
                 <p>We received a request to reset your password. The link below is \
                 valid for 10 minutes and can be used once.</p>\
                 <p><a href=\"{link}\">Reset password</a></p>\
                 <p>If you did not request this, you can ignore this email.</p>\
                 </body></html>",
                site = SITE_NAME,
                link = escape_html(reset_link),
            ),
            Template::PasswordChanged { name } => format!(
                "<html><body>\
                 <h2>Password changed</h2>\
                 <p>Hi {name},</p>\
                 <p>Your {site} admin password was just changed. If this wasn't you, \
                 contact the site owner immediately.</p>\
                 </body></html>",
                name = escape_html(name),
                site = SITE_NAME,
            ),
            Template::EnquiryNotification {
                name,
                email,
                phone,
                company,
                message,
            } => format!(
                "<html><body>\
                 <h2>New enquiry</h2>\
                 <ul>\
                 <li><strong>Name:</strong> {name}</li>\
                 <li><strong>Email:</strong> {email}</li>\
                 <li><strong>Phone:</strong> {phone}</li>\
                 <li><strong>Company:</strong> {company}</li>\
                 </ul>\
                 <p>{message}</p>\
                 </body></html>",
                name = escape_html(name),
                email = escape_html(email),
                phone = escape_html(phone),
                company = escape_html(company),
                message = escape_html(message),
            ),
            Template::EnquiryAck { name } => format!(
                "<html><body>\
                 <h2>Thanks for contacting {site}!</h2>\
                 <p>Hi {name},</p>\
                 <p>We received your message and will get back to you shortly.</p>\
                 </body></html>",
                site = SITE_NAME,
                name = escape_html(name),
            ),
            Template::NewsletterWelcome => format!(
                "<html><body>\
                 <h2>Welcome to the {site} newsletter!</h2>\
                 <p>You'll now hear about new projects, offers and updates first.</p>\
                 </body></html>",
                site = SITE_NAME,
            ),
            Template::Voucher {
                title,
                heading,
                message,
                images,
                website_url,
                unsubscribe_url,
            } => {
                let image_grid: String = images
                    .iter()
                    .map(|url| {
                        format!(
                            "<img src=\"{}\" alt=\"\" style=\"max-width:280px;margin:4px\"/>",
                            escape_html(url)
                        )
                    })
                    .collect();
                format!(
                    "<html><body>\
                     <h2>{title}</h2>\
                     <h3>{heading}</h3>\
                     <p>{message}</p>\
                     <div>{image_grid}</div>\
                     <p><a href=\"{website}\">Visit {site}</a></p>\
                     <p style=\"font-size:12px\"><a href=\"{unsubscribe}\">Unsubscribe</a></p>\
                     </body></html>",
                    title = escape_html(title),
                    heading = escape_html(heading),
                    message = escape_html(message),
                    image_grid = image_grid,
                    website = escape_html(website_url),
                    site = SITE_NAME,
                    unsubscribe = escape_html(unsubscribe_url),
                )
            }
            Template::AccountRemoved { name } => format!(
                "<html><body>\
                 <h2>Account removed</h2>\
                 <p>Hi {name},</p>\
                 <p>Your {site} admin account has been removed. If you believe this \
                 is a mistake, contact the site owner.</p>\
                 </body></html>",
                name = escape_html(name),
                site = SITE_NAME,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_reset_embeds_link() {
        let html = Template::PasswordReset {
            reset_link: "https://example.com/reset-password/abc".to_string(),
        }
        .render();
        assert!(html.contains("https://example.com/reset-password/abc"));
        assert!(html.contains("10 minutes"));
    }

    #[test]
    fn test_voucher_renders_all_images() {
        let html = Template::Voucher {
            title: "Summer offer".to_string(),
            heading: "20% off".to_string(),
            message: "Limited time".to_string(),
            images: vec!["https://cdn/a.jpg".to_string(), "https://cdn/b.jpg".to_string()],
            website_url: "https://example.com".to_string(),
            unsubscribe_url: "https://example.com/unsubscribe?email=x".to_string(),
        }
        .render();
        assert_eq!(html.matches("<img").count(), 2);
        assert!(html.contains("Unsubscribe"));
    }

    #[test]
    fn test_user_content_is_escaped() {
        let html = Template::EnquiryNotification {
            name: "<script>alert(1)</script>".to_string(),
            email: "a@b.c".to_string(),
            phone: "123".to_string(),
            company: "Acme & Co".to_string(),
            message: "hi".to_string(),
        }
        .render();
        assert!(!html.contains("<script>"));
        assert!(html.contains("Acme &amp; Co"));
    }
}
