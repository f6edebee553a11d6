//! Template resolution for rule titles and messages.
//!
//! Templates reference variables as `@name`. Resolution looks each name
//! up in the registry's variable table and splices in the provider's
//! current value. Unknown names stay in the text verbatim so partially
//! registered extension sets degrade gracefully instead of suppressing a
//! notification.
//!
//! Flat-string configuration sources cannot hold real line breaks, so a
//! literal two-character `\n` sequence unescapes to one before
//! substitution. Variable values pass through untouched.

use crate::capability::CapabilityRegistry;

/// Resolves `@name` placeholders against the variable table.
///
/// Stateless; both operations are pure over the registry's current
/// variable values.
pub struct MessageComposer;

impl MessageComposer {
    /// Resolve a template into display-ready text.
    #[must_use]
    pub fn resolve(template: &str, registry: &CapabilityRegistry) -> String {
        Self::substitute(&Self::unescape(template), registry)
    }

    /// Turn literal `\n` sequences into real line breaks.
    #[must_use]
    pub fn unescape(template: &str) -> String {
        template.replace("\\n", "\n")
    }

    fn substitute(text: &str, registry: &CapabilityRegistry) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(at) = rest.find('@') {
            out.push_str(&rest[..at]);
            let after = &rest[at + 1..];

            // A placeholder is '@' followed by a maximal identifier run.
            let len = after
                .char_indices()
                .take_while(|(i, c)| {
                    if *i == 0 {
                        c.is_ascii_alphabetic() || *c == '_'
                    } else {
                        c.is_ascii_alphanumeric() || *c == '_'
                    }
                })
                .count();

            if len == 0 {
                out.push('@');
                rest = after;
                continue;
            }

            let name = &after[..len];
            match registry.variable(name) {
                Some(f) => out.push_str(&f()),
                None => {
                    // Unknown placeholder, keep it verbatim.
                    out.push('@');
                    out.push_str(name);
                }
            }
            rest = &after[len..];
        }

        out.push_str(rest);
        out
    }
}
