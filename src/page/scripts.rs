//! In-page script builders.
//!
//! Script evaluations are stateless round trips: no object handle
//! survives between calls. The resolved editor is therefore remembered
//! through a DOM attribute mark ([`EDITOR_MARK_ATTR`]) - a weak
//! back-reference that later scripts validate and re-resolve when stale,
//! never an ownership handle.
//!
//! Every builder returns a self-invoking expression that evaluates to a
//! boolean, suitable for `Runtime.evaluate` with `returnByValue`.

// ============================================================================
// Constants
// ============================================================================

/// Attribute marking the resolved editor element. At most one element
/// carries it at any time.
pub const EDITOR_MARK_ATTR: &str = "data-weibo-autopost-editor";

/// Known composer container; the whole document is the fallback scope.
pub const BASE_CONTAINER_SELECTOR: &str = "#homeWrap";

/// Label of the submit control on the composer.
pub const SUBMIT_LABEL: &str = "发送";

/// Label of the image-upload trigger on the composer.
pub const IMAGE_LABEL: &str = "图片";

/// Selector matching native clickable elements.
const CLICKABLE_SELECTOR: &str = "button, [role=\\\"button\\\"], a";

// ============================================================================
// Editor Resolution
// ============================================================================

/// Script that resolves and marks the best-candidate editor element.
///
/// Collects visible text-input-capable elements inside the composer
/// container (falling back to the whole document), scores each by nearby
/// send/image text signals across up to 12 ancestor levels (+6 / +4,
/// first match per level) plus up to +4 scaled by rendered area (one
/// point per 50,000 px²), and marks the highest-scoring candidate with
/// score > 0. Ties keep the first candidate in document order. All other
/// candidates are unmarked first. Evaluates to `true` when an editor was
/// marked.
#[must_use]
pub fn editor_probe_script() -> String {
    let mark = json_string(EDITOR_MARK_ATTR);
    let container = json_string(BASE_CONTAINER_SELECTOR);
    let send_signal = json_string(SUBMIT_LABEL);
    let image_signal = json_string(IMAGE_LABEL);

    format!(
        r#"(() => {{
  const root = document.querySelector({container}) || document.body;

  const isVisible = (el) => {{
    if (!(el instanceof Element)) return false;
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
    const rects = el.getClientRects();
    if (!rects || rects.length === 0) return false;
    return true;
  }};

  const candidates = Array.from(root.querySelectorAll('textarea, [contenteditable="true"]'))
    .filter((el) => el instanceof HTMLElement && isVisible(el));

  const scoreFor = (el) => {{
    let score = 0;
    let node = el;
    for (let depth = 0; depth < 12 && node; depth++) {{
      const text = (node.textContent || '').replace(/\s+/g, '');
      if (text.includes({send_signal})) score += 6;
      if (text.includes({image_signal})) score += 4;
      node = node.parentElement;
      if (node === root) break;
    }}

    const rect = el.getBoundingClientRect();
    const area = Math.max(0, rect.width) * Math.max(0, rect.height);
    if (area > 0) score += Math.min(4, Math.floor(area / 50000));

    return score;
  }};

  let best = null;
  let bestScore = -1;
  for (const el of candidates) {{
    const score = scoreFor(el);
    if (score > bestScore) {{
      bestScore = score;
      best = el;
    }}
  }}

  if (!best || bestScore <= 0) return false;

  for (const el of candidates) {{
    try {{ el.removeAttribute({mark}); }} catch {{}}
  }}

  try {{ best.setAttribute({mark}, 'true'); }} catch {{}}

  return true;
}})()"#
    )
}

// ============================================================================
// Text Injection
// ============================================================================

/// Script that injects `text` into the marked editor.
///
/// Reuses the mark when the element is still editor-capable and visible,
/// otherwise re-resolves within the container scope. Textarea values go
/// through the prototype property setter to bypass framework value
/// interception; content-editable elements prefer `insertText` editing
/// commands with a direct content-replacement fallback. Input and change
/// notifications are dispatched either way. Evaluates to `false` when no
/// editor can be found or mutated.
#[must_use]
pub fn set_text_script(text: &str) -> String {
    let target = json_string(text);
    let mark = json_string(EDITOR_MARK_ATTR);
    let container = json_string(BASE_CONTAINER_SELECTOR);

    format!(
        r#"(() => {{
  const targetText = {target};
  const markAttr = {mark};

  const isVisible = (el) => {{
    if (!(el instanceof Element)) return false;
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
    return el.getClientRects().length > 0;
  }};

  const isEditor = (el) => {{
    if (!el) return false;
    const tag = (el.tagName || '').toLowerCase();
    if (tag === 'textarea') return true;
    if (el.getAttribute && el.getAttribute('contenteditable') === 'true') return true;
    return !!el.isContentEditable;
  }};

  const pickWithin = (root) => {{
    const candidates = Array.from(root.querySelectorAll('textarea, [contenteditable="true"]'));
    for (const candidate of candidates) {{
      if (isEditor(candidate) && isVisible(candidate)) return candidate;
    }}
    return null;
  }};

  let el = document.querySelector('[' + markAttr + '="true"]');
  if (el && (!isEditor(el) || !isVisible(el))) el = null;

  if (!el) {{
    const root = document.querySelector({container}) || document.body;
    el = pickWithin(root);
  }}

  if (!el) return false;

  try {{
    if (typeof el.scrollIntoView === 'function') {{
      el.scrollIntoView({{ block: 'center', inline: 'center' }});
    }}
  }} catch {{}}

  try {{
    if (typeof el.focus === 'function') el.focus();
  }} catch {{}}

  const tag = (el.tagName || '').toLowerCase();

  const dispatchInputAndChange = (node) => {{
    try {{
      node.dispatchEvent(new InputEvent('input', {{ bubbles: true, data: targetText, inputType: 'insertText' }}));
    }} catch {{
      try {{ node.dispatchEvent(new Event('input', {{ bubbles: true }})); }} catch {{}}
    }}
    try {{ node.dispatchEvent(new Event('change', {{ bubbles: true }})); }} catch {{}}
  }};

  if (tag === 'textarea') {{
    try {{
      const desc = Object.getOwnPropertyDescriptor(HTMLTextAreaElement.prototype, 'value');
      if (desc && typeof desc.set === 'function') {{
        desc.set.call(el, targetText);
      }} else {{
        el.value = targetText;
      }}
    }} catch {{
      try {{ el.value = targetText; }} catch {{}}
    }}

    dispatchInputAndChange(el);
    return true;
  }}

  let inserted = false;
  try {{
    if (typeof document.execCommand === 'function') {{
      try {{ document.execCommand('selectAll', false, null); }} catch {{}}
      inserted = document.execCommand('insertText', false, targetText);
    }}
  }} catch {{}}

  if (!inserted) {{
    try {{
      el.textContent = targetText;
    }} catch {{
      return false;
    }}
  }}

  dispatchInputAndChange(el);
  return true;
}})()"#
    )
}

// ============================================================================
// Button Resolution
// ============================================================================

/// Script that clicks the best visible, enabled control matching `label`.
///
/// The label is normalized (zero-width characters stripped, whitespace
/// collapsed). The search scope is the nearest ancestor of the marked
/// editor, up to 10 levels, that contains a visible clickable matching
/// the label by accessible-label, title, or text content; only when no
/// such ancestor exists does the scope widen to the base container.
/// Native clickables are tried first, then generic text-bearing elements
/// climbing to their nearest clickable via `closest()`. Disabled targets
/// (native attribute or `aria-disabled="true"`) are skipped. Evaluates to
/// `true` when something was clicked.
#[must_use]
pub fn click_labeled_script(label: &str) -> String {
    let raw_label = json_string(label);
    let mark = json_string(EDITOR_MARK_ATTR);
    let container = json_string(BASE_CONTAINER_SELECTOR);

    format!(
        r#"(() => {{
  const rawLabel = {raw_label};
  const markAttr = {mark};

  const normalize = (value) => {{
    return String(value ?? '')
      .replace(/[​-‍﻿]/g, '')
      .replace(/[\s ]+/g, ' ')
      .trim();
  }};

  const target = normalize(rawLabel);
  if (!target) return false;

  const isVisible = (el) => {{
    if (!(el instanceof Element)) return false;
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    return el.getClientRects().length > 0;
  }};

  const isDisabled = (el) => {{
    if (!(el instanceof Element)) return false;
    if (el.getAttribute && el.getAttribute('disabled') !== null) return true;
    const ariaDisabled = el.getAttribute ? el.getAttribute('aria-disabled') : null;
    if (ariaDisabled && normalize(ariaDisabled).toLowerCase() === 'true') return true;
    return false;
  }};

  const safeClick = (el) => {{
    try {{
      if (!el || !(el instanceof Element)) return false;
      if (isDisabled(el)) return false;
      if (typeof el.scrollIntoView === 'function') {{
        try {{ el.scrollIntoView({{ block: 'center', inline: 'center' }}); }} catch {{}}
      }}
      if (el instanceof HTMLElement && typeof el.focus === 'function') {{
        try {{ el.focus(); }} catch {{}}
      }}
      el.click();
      return true;
    }} catch {{
      return false;
    }}
  }};

  const preferredSelector = '{CLICKABLE_SELECTOR}';
  const matches = (el) => {{
    const ariaLabel = el.getAttribute ? el.getAttribute('aria-label') : null;
    const title = el.getAttribute ? el.getAttribute('title') : null;
    const text = el.textContent;

    const normalizedAriaLabel = normalize(ariaLabel);
    const normalizedTitle = normalize(title);
    const normalizedText = normalize(text);

    return (normalizedAriaLabel === target || normalizedAriaLabel.includes(target))
      || (normalizedTitle === target || normalizedTitle.includes(target))
      || (normalizedText === target || normalizedText.includes(target));
  }};

  const base = document.querySelector({container}) || document.body;
  let scope = base;

  const hasMatchingClickable = (root) => {{
    try {{
      return Array.from(root.querySelectorAll(preferredSelector))
        .filter((el) => isVisible(el))
        .some((el) => matches(el));
    }} catch {{
      return false;
    }}
  }};

  const editor = document.querySelector('[' + markAttr + '="true"]');
  if (editor && editor instanceof Element) {{
    let node = editor;
    for (let depth = 0; depth < 10 && node; depth++) {{
      if (node === base) break;
      if (hasMatchingClickable(node)) {{
        scope = node;
        break;
      }}
      node = node.parentElement;
    }}
  }}

  const preferredCandidates = Array.from(scope.querySelectorAll(preferredSelector)).filter((el) => isVisible(el));

  for (const el of preferredCandidates) {{
    if (!matches(el)) continue;
    if (safeClick(el)) return true;
  }}

  const textCandidates = Array.from(
    scope.querySelectorAll('span, div, p, label, strong, em, ' + preferredSelector),
  ).filter((el) => isVisible(el));

  for (const el of textCandidates) {{
    if (!normalize(el.textContent).includes(target)) continue;
    const clickable = typeof el.closest === 'function' ? el.closest(preferredSelector) : null;
    if (clickable && isVisible(clickable) && safeClick(clickable)) return true;
    if (safeClick(el)) return true;
  }}

  return false;
}})()"#
    )
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Escapes a string into a JavaScript string literal.
pub(crate) fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_probe_scoring_constants() {
        let script = editor_probe_script();

        // 12 ancestor levels, +6 send signal, +4 image signal, area cap.
        assert!(script.contains("depth < 12"));
        assert!(script.contains("score += 6"));
        assert!(script.contains("score += 4"));
        assert!(script.contains("Math.min(4, Math.floor(area / 50000))"));
        assert!(script.contains("bestScore <= 0"));
    }

    #[test]
    fn test_editor_probe_marks_exactly_one() {
        let script = editor_probe_script();

        // Every candidate is unmarked before the winner is marked.
        assert!(script.contains("removeAttribute"));
        assert!(script.contains("setAttribute"));
        assert!(script.contains(EDITOR_MARK_ATTR));
    }

    #[test]
    fn test_editor_probe_keeps_first_on_tie() {
        // Strictly-greater comparison keeps the earliest candidate in
        // document order when scores tie.
        let script = editor_probe_script();
        assert!(script.contains("score > bestScore"));
        assert!(!script.contains("score >= bestScore"));
    }

    #[test]
    fn test_set_text_escapes_label() {
        let script = set_text_script("a \"quoted\"\nline");
        assert!(script.contains(r#""a \"quoted\"\nline""#));
    }

    #[test]
    fn test_set_text_uses_property_setter_and_events() {
        let script = set_text_script("hi");
        assert!(script.contains("Object.getOwnPropertyDescriptor(HTMLTextAreaElement.prototype, 'value')"));
        assert!(script.contains("execCommand('insertText'"));
        assert!(script.contains("new InputEvent('input'"));
        assert!(script.contains("new Event('change'"));
    }

    #[test]
    fn test_click_labeled_normalizes_and_scopes() {
        let script = click_labeled_script(SUBMIT_LABEL);

        // Zero-width strip, ancestor-scope walk, disabled checks.
        assert!(script.contains(r"​-‍﻿"));
        assert!(script.contains("depth < 10"));
        assert!(script.contains("aria-disabled"));
        assert!(script.contains("closest"));
        assert!(script.contains("发送"));
    }

    #[test]
    fn test_click_labeled_escapes_hostile_label() {
        let script = click_labeled_script("x\"); alert(1); (\"");
        // The label lands as one JSON string literal, not as code.
        assert!(script.contains(r#""x\"); alert(1); (\"""#));
    }

    #[test]
    fn test_scripts_are_self_invoking_expressions() {
        for script in [
            editor_probe_script(),
            set_text_script("t"),
            click_labeled_script("l"),
        ] {
            assert!(script.starts_with("(() => {"));
            assert!(script.ends_with("})()"));
        }
    }
}
