use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    DeriveInput, Ident, LitStr, Token, Type,
};

use crate::{Expand, Expanded};

/// UID attributes
///
/// #[uid(data = <type>, field = "<name>")]
#[derive(Debug, Clone)]
pub struct Attributes {
    pub data: Type,
    pub field: Option<LitStr>,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            data: syn::parse_quote!(Vec<f64>),
            field: None,
        }
    }
}

impl Parse for Attributes {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut uid_attrs: Attributes = Default::default();
        while let Ok(key) = input.parse::<Ident>() {
            let _ = input.parse::<Token!(=)>()?;
            if key == "data" {
                uid_attrs.data = input.parse::<Type>()?;
            } else if key == "field" {
                uid_attrs.field = Some(input.parse::<LitStr>()?);
            } else {
                return Err(syn::Error::new(
                    key.span(),
                    format!("unknown uid attribute `{key}`, expected `data` or `field`"),
                ));
            }
            let Ok(_) = input.parse::<Token!(,)>() else {
                return Ok(uid_attrs);
            };
        }
        Ok(uid_attrs)
    }
}
impl Expand for Attributes {
    fn expand(&self, input: &DeriveInput) -> Expanded {
        let DeriveInput {
            ident, generics, ..
        } = input;
        let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
        let Self { data, field } = self;
        let field = field
            .clone()
            .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
        quote! {
            impl #impl_generics ::interface::UniqueIdentifier for #ident #ty_generics #where_clause {
                const FIELD: &'static str = #field;
                type DataType = #data;
            }
        }
    }
}
