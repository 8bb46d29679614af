pub mod breaks;
pub mod copy;
pub mod mobile;
pub mod references;
pub mod sections;

use tracing::debug;

use crate::content::Content;
use crate::view::{ContentView, ReferenceOrigin};
use mobile::MobileOptions;
use sections::Splitter;

/// Split → (mobile, copy, references): every output a view can show,
/// computed once per content.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    splitter: Splitter,
    mobile: MobileOptions,
}

impl Pipeline {
    pub fn new(splitter: Splitter, mobile: MobileOptions) -> Self {
        Self { splitter, mobile }
    }

    pub fn splitter(&self) -> &Splitter {
        &self.splitter
    }

    pub fn process(&self, content: &Content) -> ContentView {
        let split = self.splitter.split(&content.body);
        let main_html = breaks::to_html_breaks(split.main_body);
        let mobile_html = mobile::format_with(&main_html, &self.mobile);
        let copy_text = copy::prepare_with(&self.splitter, &content.body);

        let (references, origin) = match &content.references {
            Some(refs) => (refs.clone(), ReferenceOrigin::Supplied),
            None => (
                references::extract_with(&self.splitter, split.appendix),
                ReferenceOrigin::Extracted,
            ),
        };

        debug!(
            id = %content.id,
            has_appendix = split.has_appendix(),
            references = references.len(),
            ?origin,
            "content processed"
        );

        ContentView::new(content, main_html, mobile_html, copy_text, references, origin)
    }
}

// ── Tests ──
