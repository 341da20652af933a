#[allow(unused_imports)]
use super::super::*;
use super::{ParsedField, TimestampFlag};

pub(crate) struct ParsedRecord {
    name: Ident,
    table: Option<String>,
    fields: Vec<ParsedField>,
}

impl ParsedRecord {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        let mut table = None;
        for attr in &input.attrs {
            if attr.path().is_ident("rowmap") {
                Self::parse_container_attr(attr, &mut table)?;
            }
        }

        if !input.generics.params.is_empty() {
            return Err(Error::new_spanned(
                &input.generics,
                "Record cannot be derived for generic structs; implement rowmap::Record by hand",
            ));
        }

        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => {
                    let mut parsed = Vec::new();
                    for field in &named.named {
                        parsed.push(ParsedField::from_field(field)?);
                    }
                    parsed
                }
                _ => return Err(Error::new(input.ident.span(), "Record requires named fields")),
            },
            _ => return Err(Error::new(input.ident.span(), "Record can only be derived for structs")),
        };

        let mut seen: Vec<TimestampFlag> = Vec::new();
        for field in &fields {
            if let Some(flag) = field.timestamp {
                if seen.contains(&flag) {
                    return Err(Error::new(
                        field.span,
                        format!("only one field may be marked #[rowmap({})]", flag.attr_name()),
                    ));
                }
                seen.push(flag);
            }
        }

        Ok(Self {
            name: input.ident.clone(),
            table,
            fields,
        })
    }

    fn parse_container_attr(attr: &Attribute, table: &mut Option<String>) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(meta.error("table name cannot be empty"));
                }
                *table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unknown rowmap container attribute, expected `table`"))
            }
        })
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let name = &self.name;
        let name_lit = LitStr::new(&name.to_string(), Span::call_site());

        // Skipped fields are invisible to the mapper; offsets count the remaining ones.
        let fields: Vec<&ParsedField> = self.fields.iter().filter(|f| !f.skip).collect();

        let shapes = fields.iter().map(|field| {
            let ident_lit = LitStr::new(&field.ident.to_string(), Span::call_site());
            let ty = &field.ty;
            let tags = field.tags.iter().map(|(key, raw)| quote! { (#key, #raw) });
            let ctor = if field.embed {
                quote! { ::rowmap::record::FieldShape::embedded::<#ty>(#ident_lit, &[#(#tags),*]) }
            } else {
                quote! { ::rowmap::record::FieldShape::column::<#ty>(#ident_lit, &[#(#tags),*]) }
            };
            match field.timestamp {
                Some(flag) => {
                    let kind = flag.to_tokens();
                    quote! { #ctor.with_timestamp(#kind) }
                }
                None => ctor,
            }
        });

        let column_arms = fields.iter().enumerate().filter(|(_, f)| !f.embed).map(|(offset, field)| {
            let ident = &field.ident;
            quote! { #offset => ::core::option::Option::Some(&self.#ident as &dyn ::rowmap::value::Column) }
        });

        let embedded_arms = fields.iter().enumerate().filter(|(_, f)| f.embed).map(|(offset, field)| {
            let ident = &field.ident;
            quote! { #offset => ::rowmap::record::EmbeddedRecord::as_record(&self.#ident) }
        });

        let table = self.table.as_ref().map(|table| quote! { .with_table(#table) });
        let set_timestamp = self.emit_set_timestamp(&fields);

        quote! {
            impl ::rowmap::record::Record for #name {
                fn record_shape() -> ::rowmap::record::RecordShape {
                    ::rowmap::record::RecordShape::new::<Self>(#name_lit, ::std::vec![#(#shapes),*])
                        #table
                }

                fn shape(&self) -> ::rowmap::record::RecordShape {
                    <Self as ::rowmap::record::Record>::record_shape()
                }

                fn record_type_id(&self) -> ::core::any::TypeId {
                    ::core::any::TypeId::of::<Self>()
                }

                #[allow(clippy::match_single_binding)]
                fn column(&self, offset: usize) -> ::core::option::Option<&dyn ::rowmap::value::Column> {
                    match offset {
                        #(#column_arms,)*
                        _ => ::core::option::Option::None,
                    }
                }

                #[allow(clippy::match_single_binding)]
                fn embedded(&self, offset: usize) -> ::core::option::Option<&dyn ::rowmap::record::Record> {
                    match offset {
                        #(#embedded_arms,)*
                        _ => ::core::option::Option::None,
                    }
                }

                #set_timestamp
            }

            ::rowmap::inventory::submit! {
                ::rowmap::record::RecordRegistration {
                    type_name: #name_lit,
                    shape: <#name as ::rowmap::record::Record>::record_shape,
                }
            }
        }
    }

    fn emit_set_timestamp(&self, fields: &[&ParsedField]) -> Option<TokenStream2> {
        let arms: Vec<TokenStream2> = fields
            .iter()
            .filter_map(|field| {
                let kind = field.timestamp?.to_tokens();
                let ident = &field.ident;
                Some(quote! {
                    #kind => {
                        self.#ident = ::core::convert::Into::into(at);
                        true
                    }
                })
            })
            .collect();

        if arms.is_empty() {
            return None;
        }

        Some(quote! {
            #[allow(unreachable_patterns)]
            fn set_timestamp(
                &mut self,
                kind: ::rowmap::record::TimestampKind,
                at: ::rowmap::chrono::DateTime<::rowmap::chrono::Utc>,
            ) -> bool {
                match kind {
                    #(#arms)*
                    _ => false,
                }
            }
        })
    }
}
