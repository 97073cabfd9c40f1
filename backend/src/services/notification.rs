//! Award notifications and student delivery by e-mail
//!
//! Every send here is best effort: a failed delivery is logged and the
//! request carries on.

use std::collections::BTreeSet;
use std::sync::Arc;

use shared::validation::{clean_filename, parse_email_list};

use crate::config::SiteConfig;
use crate::error::AppResult;
use crate::external::mail::{MailAddress, MailAttachment, Mailer, OutgoingMail};
use crate::external::storage::PDF_MIME_TYPE;
use crate::models::{capability, CertificateDefinition, CertificateIssue, Course, GroupMode, UserRecord};
use crate::repository::{CertificateRepository, Directory};
use crate::services::access::RequestContext;

/// Wording shared by the teacher and external award messages
struct AwardMessage {
    subject: String,
    text: String,
    html: String,
}

impl AwardMessage {
    fn new(student: &str, course: &Course, definition: &CertificateDefinition, url: &str) -> Self {
        let body = format!(
            "{student} has received the certificate '{certificate}' in course '{course}'. \
             See the issued certificates report: {url}",
            student = student,
            certificate = definition.name,
            course = course.full_name,
            url = url,
        );
        let html = format!(
            "<font face=\"sans-serif\"><p>{student} has received the certificate \
             '<i>{certificate}</i>' in course '{course}'. \
             <a href=\"{url}\">Issued certificates</a></p></font>",
            student = escape_html(student),
            certificate = escape_html(&definition.name),
            course = escape_html(&course.full_name),
            url = escape_html(url),
        );
        Self {
            subject: format!("Certificate awarded: {} -> {}", student, definition.name),
            text: format!("{}\n", body),
            html,
        }
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Clone)]
pub struct Notifier {
    certificates: Arc<dyn CertificateRepository>,
    directory: Arc<dyn Directory>,
    mailer: Arc<dyn Mailer>,
    site: SiteConfig,
    site_name: String,
}

impl Notifier {
    pub fn new(
        certificates: Arc<dyn CertificateRepository>,
        directory: Arc<dyn Directory>,
        mailer: Arc<dyn Mailer>,
        site: SiteConfig,
        site_name: impl Into<String>,
    ) -> Self {
        Self {
            certificates,
            directory,
            mailer,
            site,
            site_name: site_name.into(),
        }
    }

    /// Managers of the module who should hear about a student's award
    pub async fn teachers_to_notify(
        &self,
        ctx: &RequestContext,
        student: &UserRecord,
    ) -> AppResult<Vec<UserRecord>> {
        let managers = self
            .directory
            .users_with_capability(ctx.module.id, capability::MANAGE)
            .await?;
        let candidates = managers.into_iter().filter(|t| t.id != student.id);

        if ctx.module.group_mode != GroupMode::Separate {
            return Ok(candidates.collect());
        }

        let student_groups = self.directory.user_groups(ctx.course.id, student.id).await?;
        let mut teachers = Vec::new();
        if student_groups.is_empty() {
            for teacher in candidates {
                if self.directory.user_groups(ctx.course.id, teacher.id).await?.is_empty() {
                    teachers.push(teacher);
                }
            }
        } else {
            let mut members = BTreeSet::new();
            for group in &student_groups {
                members.extend(self.directory.group_members(group.id).await?);
            }
            teachers.extend(candidates.filter(|t| members.contains(&t.id)));
        }
        Ok(teachers)
    }

    /// Tell teachers and external recipients that an issue was finalised
    pub async fn notify_issued(
        &self,
        ctx: &RequestContext,
        definition: &CertificateDefinition,
        issue: &CertificateIssue,
    ) -> AppResult<()> {
        let send_teachers = definition.email_teachers;
        let others = parse_email_list(&definition.email_others);
        if !send_teachers && others.is_empty() {
            return Ok(());
        }

        let url = self.site.report_url(ctx.module.id);
        let message = AwardMessage::new(&issue.student_name, &ctx.course, definition, &url);

        if send_teachers {
            let student = if ctx.user.id == issue.user_id {
                Some(ctx.user.clone())
            } else {
                self.directory.find_user(issue.user_id).await?
            };
            if let Some(student) = student {
                for teacher in self.teachers_to_notify(ctx, &student).await? {
                    let html = teacher.mail_html.then(|| message.html.clone());
                    let to = MailAddress::new(Some(teacher.full_name()), teacher.email.clone());
                    self.deliver(to, &issue.student_name, &message, html).await;
                }
            }
        }

        for address in others {
            let to = MailAddress::new(None, address);
            self.deliver(to, &issue.student_name, &message, Some(message.html.clone()))
                .await;
        }
        Ok(())
    }

    async fn deliver(&self, to: MailAddress, from_name: &str, message: &AwardMessage, html: Option<String>) {
        let recipient = to.email.clone();
        let mail = OutgoingMail {
            to,
            from_name: from_name.to_string(),
            subject: message.subject.clone(),
            text: message.text.clone(),
            html,
            attachment: None,
        };
        match self.mailer.send(mail).await {
            Ok(()) => tracing::info!(to = %recipient, "Award notification sent"),
            Err(e) => tracing::warn!(to = %recipient, error = %e, "Award notification failed"),
        }
    }

    /// Mail the rendered certificate to its student once
    ///
    /// Returns true when a message was handed to the transport.
    pub async fn email_student(
        &self,
        ctx: &RequestContext,
        definition: &CertificateDefinition,
        issue: &CertificateIssue,
        pdf: &[u8],
    ) -> AppResult<bool> {
        if issue.mailed {
            tracing::debug!(issue_id = issue.id, "Certificate already mailed");
            return Ok(false);
        }

        let sender = self
            .directory
            .users_with_capability(ctx.module.id, capability::COURSE_UPDATE)
            .await?
            .into_iter()
            .next()
            .map(|teacher| teacher.full_name())
            .unwrap_or_else(|| self.site_name.clone());

        if !self.certificates.mark_mailed(issue.id).await? {
            tracing::debug!(issue_id = issue.id, "Certificate mailed concurrently");
            return Ok(false);
        }

        let student_name = ctx.user.full_name();
        let text = format!(
            "Dear {},\n\nAttached is your certificate for {}.\n",
            student_name, ctx.course.full_name
        );
        let html = format!(
            "<p>Dear {},</p><p>Attached is your certificate for {}.</p>",
            escape_html(&student_name),
            escape_html(&ctx.course.full_name)
        );
        let mail = OutgoingMail {
            to: MailAddress::new(Some(student_name), ctx.user.email.clone()),
            from_name: sender,
            subject: format!("{}: {}", ctx.course.full_name, definition.name),
            text,
            html: Some(html),
            attachment: Some(MailAttachment {
                filename: clean_filename(&format!("{}.pdf", definition.name)),
                content_type: PDF_MIME_TYPE.to_string(),
                bytes: pdf.to_vec(),
            }),
        };

        match self.mailer.send(mail).await {
            Ok(()) => tracing::info!(issue_id = issue.id, "Certificate mailed to student"),
            Err(e) => tracing::warn!(issue_id = issue.id, error = %e, "Student certificate mail failed"),
        }
        Ok(true)
    }
}
