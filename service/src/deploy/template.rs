//! Published document synthesis.
//!
//! Builds the self-contained HTML shell a page is served as when no
//! prebuilt artifact exists: the page content embedded as an
//! initialization payload, plus the form submission runtime. The runtime's
//! payload shape and endpoint path are consumed by the forms backend and
//! must not drift.

use crate::models::page::Page;

/// Client-side form runtime embedded into every synthesized document.
/// Submissions go to `{api_origin}/api/forms/submit`.
const FORM_RUNTIME: &str = r#"(function () {
  var API_ORIGIN = '__API_ORIGIN__';
  var PAGE_ID = '__PAGE_ID__';

  function deviceType() {
    var width = window.innerWidth;
    if (width < 768) return 'mobile';
    if (width < 1024) return 'tablet';
    return 'desktop';
  }

  function collectMetadata() {
    var params = new URLSearchParams(window.location.search);
    return {
      device_type: deviceType(),
      user_agent: navigator.userAgent,
      screen_resolution: window.screen.width + 'x' + window.screen.height,
      referrer: document.referrer,
      utm_source: params.get('utm_source'),
      utm_medium: params.get('utm_medium'),
      utm_campaign: params.get('utm_campaign'),
      utm_term: params.get('utm_term'),
      utm_content: params.get('utm_content'),
      page_url: window.location.href,
      submitted_at: new Date().toISOString()
    };
  }

  function attach(form, index) {
    form.addEventListener('submit', function (event) {
      event.preventDefault();
      var data = {};
      new FormData(form).forEach(function (value, key) {
        data[key] = value;
      });
      var payload = {
        page_id: PAGE_ID,
        form_id: form.id || form.getAttribute('data-form-id') || 'form-' + index,
        form_data: data,
        metadata: collectMetadata()
      };
      fetch(API_ORIGIN + '/api/forms/submit', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(payload)
      }).then(function () {
        form.reset();
      }).catch(function (err) {
        console.error('Form submission failed', err);
      });
    });
  }

  document.addEventListener('DOMContentLoaded', function () {
    var forms = document.querySelectorAll('form');
    for (var i = 0; i < forms.length; i++) {
      attach(forms[i], i);
    }
  });
})();"#;

/// Render the self-contained document for a page
pub fn render_document(page: &Page, forms_api_origin: &str) -> String {
    let title = page
        .title
        .clone()
        .or_else(|| page.slug.clone())
        .unwrap_or_else(|| "Untitled".to_string());

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n\
         </head>\n\
         <body>\n\
         <div id=\"app\"></div>\n\
         <script>\n\
         window.__PAGE_CONTENT__ = {};\n\
         </script>\n\
         <script>\n{}\n</script>\n\
         </body>\n\
         </html>\n",
        escape_html(&title),
        serialize_content(&page.content),
        form_runtime(forms_api_origin, &page.id),
    )
}

/// Serialize content for embedding in a script block. `</` is escaped so
/// a string value containing `</script>` cannot terminate the block.
fn serialize_content(content: &serde_json::Value) -> String {
    serde_json::to_string(content)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

fn form_runtime(api_origin: &str, page_id: &str) -> String {
    FORM_RUNTIME
        .replace("__API_ORIGIN__", &escape_js(api_origin.trim_end_matches('/')))
        .replace("__PAGE_ID__", &escape_js(page_id))
}

/// Escape for a single-quoted JS string literal
fn escape_js(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace("</", "<\\/")
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
