pub mod account;
pub mod catalogs;
pub mod categorias;
pub mod diarios;
pub mod documentos;
pub mod functions;
pub mod lancamentos;
pub mod obras;
pub mod support;

/// `Content-Disposition` value with an ASCII fallback plus the RFC 5987
/// encoded original name.
pub(crate) fn content_disposition(kind: &str, filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded: String = url::form_urlencoded::byte_serialize(filename.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("{kind}; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::content_disposition;

    #[test]
    fn disposition_keeps_header_ascii() {
        let v = content_disposition("attachment", "relatório obra.pdf");
        assert!(v.is_ascii());
        assert!(v.starts_with("attachment; filename=\"relat_rio_obra.pdf\""));
        assert!(v.ends_with("filename*=UTF-8''relat%C3%B3rio%20obra.pdf"));
    }
}
