//! In-page scripts evaluated through `Runtime.evaluate`.
//!
//! A matched element is tagged with a per-match anchor attribute so that later
//! commands can address it with a plain CSS selector. The anchor is removed
//! again once the step holding the reference is done with it.

use serde_json::Value;
use uuid::Uuid;

use crate::page::ElementQuery;

pub(crate) const ANCHOR_ATTRIBUTE: &str = "data-replayer-anchor";

fn js_string(input: &str) -> String {
    Value::String(input.to_string()).to_string()
}

const VISIBILITY_HELPER: &str = r#"
    const isVisible = (el) => {
        if (!(el instanceof Element)) return false;
        const style = window.getComputedStyle(el);
        if (style.visibility === 'hidden' || style.display === 'none') return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 || rect.height > 0 || el.getClientRects().length > 0;
    };
"#;

/// Script returning `{status, count, selector?}` or `{status: 'invalid', reason}`.
pub(crate) fn query_script(query: &ElementQuery) -> String {
    let collect = match query {
        ElementQuery::Attribute { names, value } => {
            let names = Value::from(names.clone()).to_string();
            format!(
                r#"const names = {names};
            const wanted = {value};
            const found = Array.from(document.querySelectorAll('*')).filter(el =>
                names.some(name => el.getAttribute(name) === wanted));"#,
                value = js_string(value),
            )
        }
        ElementQuery::Css { selector } => format!(
            "const found = Array.from(document.querySelectorAll({}));",
            js_string(selector)
        ),
        ElementQuery::XPath { expression } => format!(
            r#"const snapshot = document.evaluate({}, document, null,
                XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
            const found = [];
            for (let i = 0; i < snapshot.snapshotLength; i++) {{
                const node = snapshot.snapshotItem(i);
                if (node instanceof Element) found.push(node);
            }}"#,
            js_string(expression)
        ),
        ElementQuery::Text { text } => format!(
            r#"const target = {};
            const normalize = (input) => (input || '').trim();
            const exact = Array.from(document.querySelectorAll('body *')).filter(el =>
                isVisible(el) && normalize(el.innerText || el.textContent) === target);
            const found = exact.filter(el => !exact.some(other => other !== el && el.contains(other)));"#,
            js_string(text)
        ),
    };

    let token = format!("m-{}", Uuid::new_v4().simple());
    format!(
        r#"(() => {{
            {VISIBILITY_HELPER}
            const attr = {attr};
            const token = {token};
            try {{
                {collect}
                if (found.length !== 1) {{
                    return {{ status: 'ok', count: found.length }};
                }}
                found[0].setAttribute(attr, token);
                return {{ status: 'ok', count: 1, selector: '[' + attr + '="' + token + '"]' }};
            }} catch (err) {{
                return {{ status: 'invalid', reason: String(err && err.message || err) }};
            }}
        }})()"#,
        attr = js_string(ANCHOR_ATTRIBUTE),
        token = js_string(&token),
    )
}

/// Script returning `{attached, visible, enabled}` for an anchored element.
pub(crate) fn state_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            {VISIBILITY_HELPER}
            const el = document.querySelector({selector});
            if (!el) return {{ attached: false, visible: false, enabled: false }};
            const enabled = !el.disabled && el.getAttribute('aria-disabled') !== 'true';
            return {{ attached: el.isConnected, visible: isVisible(el), enabled }};
        }})()"#,
        selector = js_string(selector),
    )
}

/// Script that empties an input or editable element and focuses it.
pub(crate) fn clear_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) return {{ status: 'detached' }};
            el.focus();
            if ('value' in el) {{
                el.value = '';
            }} else if (el.isContentEditable) {{
                el.textContent = '';
            }}
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            return {{ status: 'ok' }};
        }})()"#,
        selector = js_string(selector),
    )
}

/// Script selecting the option whose value or label equals `option`.
pub(crate) fn select_script(selector: &str, option: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) return {{ status: 'detached' }};
            const wanted = {option};
            const options = Array.from(el.options || []);
            const match = options.find(opt => opt.value === wanted)
                || options.find(opt => (opt.label || opt.text || '').trim() === wanted);
            if (!match) return {{ status: 'option-not-found' }};
            el.value = match.value;
            match.selected = true;
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return {{ status: 'ok' }};
        }})()"#,
        selector = js_string(selector),
        option = js_string(option),
    )
}

/// Script returning the trimmed visible text of an element, or `null`.
pub(crate) fn text_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) return null;
            const raw = ('value' in el && typeof el.value === 'string' && el.tagName !== 'BUTTON')
                ? el.value
                : (el.innerText || el.textContent || '');
            return raw.trim();
        }})()"#,
        selector = js_string(selector),
    )
}

/// Script removing the anchor attribute behind `selector`, if still present.
pub(crate) fn release_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (el) el.removeAttribute({attr});
            return {{ status: 'ok' }};
        }})()"#,
        selector = js_string(selector),
        attr = js_string(ANCHOR_ATTRIBUTE),
    )
}
