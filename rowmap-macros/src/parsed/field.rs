#[allow(unused_imports)]
use super::super::*;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimestampFlag {
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

impl TimestampFlag {
    fn from_ident(name: &str) -> Option<Self> {
        match name {
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            "deleted_at" => Some(Self::DeletedAt),
            _ => None,
        }
    }

    pub(crate) fn attr_name(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DeletedAt => "deleted_at",
        }
    }

    pub(crate) fn to_tokens(self) -> TokenStream2 {
        match self {
            Self::CreatedAt => quote! { ::rowmap::record::TimestampKind::CreatedAt },
            Self::UpdatedAt => quote! { ::rowmap::record::TimestampKind::UpdatedAt },
            Self::DeletedAt => quote! { ::rowmap::record::TimestampKind::DeletedAt },
        }
    }
}

pub(crate) struct ParsedField {
    pub ident: Ident,
    pub ty: Type,
    /// `(annotation key, raw annotation)` in declaration order.
    pub tags: Vec<(String, String)>,
    pub embed: bool,
    pub skip: bool,
    pub timestamp: Option<TimestampFlag>,
    pub span: Span,
}

impl ParsedField {
    pub(crate) fn from_field(field: &Field) -> Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new(field.span(), "Record requires named fields"))?;

        let mut parsed = Self {
            span: ident.span(),
            ident,
            ty: field.ty.clone(),
            tags: Vec::new(),
            embed: false,
            skip: false,
            timestamp: None,
        };

        for attr in &field.attrs {
            if attr.path().is_ident("rowmap") {
                parsed.parse_field_attr(attr)?;
            }
        }

        if parsed.skip && (parsed.embed || parsed.timestamp.is_some() || !parsed.tags.is_empty()) {
            return Err(Error::new(
                parsed.span,
                "#[rowmap(skip)] cannot be combined with other rowmap attributes",
            ));
        }

        Ok(parsed)
    }

    fn parse_field_attr(&mut self, attr: &Attribute) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            let Some(key) = meta.path.get_ident().map(Ident::to_string) else {
                return Err(meta.error("expected a simple identifier"));
            };

            if key == "embed" {
                if self.timestamp.is_some() {
                    return Err(meta.error("#[rowmap(embed)] cannot be combined with a timestamp flag"));
                }
                self.embed = true;
            } else if key == "skip" {
                self.skip = true;
            } else if let Some(flag) = TimestampFlag::from_ident(&key) {
                if self.embed {
                    return Err(meta.error("#[rowmap(embed)] cannot be combined with a timestamp flag"));
                }
                if let Some(existing) = self.timestamp {
                    return Err(meta.error(format!(
                        "field already marked as #[rowmap({})]",
                        existing.attr_name()
                    )));
                }
                self.timestamp = Some(flag);
            } else {
                let value: LitStr = meta.value()?.parse()?;
                if self.tags.iter().any(|(k, _)| *k == key) {
                    return Err(meta.error(format!("duplicate `{key}` annotation")));
                }
                self.tags.push((key, value.value()));
            }
            Ok(())
        })
    }
}
