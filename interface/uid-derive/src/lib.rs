/*!
# UID

A derive macro that implements the [UniqueIdentifier] trait.

## Examples

Setting the data type and field name to the default values: `Vec<f64>` and the type name, respectively:
```
use interface::UID;

#[derive(UID)]
enum SlowOrbX {}
```

The data type and field name are set with:
```
use interface::UID;

#[derive(UID)]
#[uid(data = Vec<bool>, field = "EnblListBPM-RB")]
enum EnblListBpm {}
```

[UniqueIdentifier]: ../sofb_interface/trait.UniqueIdentifier.html
*/

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

#[proc_macro_derive(UID, attributes(uid))]
pub fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    Parser::new(&input)
        .map_or_else(syn::Error::into_compile_error, |parser| {
            parser.uid_attrs.expand(&input)
        })
        .into()
}

mod uid;

/// Derive attributes parser
///
/// #[uid(...)]
#[derive(Debug, Clone, Default)]
struct Parser {
    pub uid_attrs: uid::Attributes,
}

impl Parser {
    fn new(input: &DeriveInput) -> syn::Result<Parser> {
        let mut parser: Parser = Default::default();
        for attr in &input.attrs {
            if attr.path().is_ident("uid") {
                parser.uid_attrs = attr.parse_args()?;
            }
        }
        Ok(parser)
    }
}

type Expanded = proc_macro2::TokenStream;

trait Expand {
    fn expand(&self, input: &DeriveInput) -> Expanded;
}
