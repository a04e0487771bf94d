/// Joins `base` and `relative` into an operation target.
///
/// Plain string concatenation: nothing is canonicalized, checked for existence
/// or resolved through symlinks, and trailing slashes on `relative` are kept
/// (they matter to rsync). An empty `relative` yields `base` unchanged.
pub fn resolve_target<B: AsRef<str>, R: AsRef<str>>(base: B, relative: R) -> String {
    let (base, relative) = (base.as_ref(), relative.as_ref());
    if relative.is_empty() {
        base.to_string()
    } else if base.ends_with('/') {
        format!("{base}{relative}")
    } else {
        format!("{base}/{relative}")
    }
}
