use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Ident, LitByteStr, Result, Token, Type, Visibility, braced, parenthesized,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

/// A single foreign function: either a COM method or a library export
struct Method {
    attrs: Vec<Attribute>,
    name: Ident,
    args: Vec<(Ident, Type)>,
    ret: Type,
}

impl Parse for Method {
    fn parse(input: ParseStream) -> Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;

        // fn Name(args) -> RetType;
        input.parse::<Token![fn]>()?;
        let name: Ident = input.parse()?;

        let args_content;
        parenthesized!(args_content in input);
        let args_parsed: Punctuated<(Ident, Type), Token![,]> =
            args_content.parse_terminated(
                |input| {
                    let name: Ident = input.parse()?;
                    input.parse::<Token![:]>()?;
                    let ty: Type = input.parse()?;
                    Ok((name, ty))
                },
                Token![,],
            )?;

        input.parse::<Token![->]>()?;
        let ret: Type = input.parse()?;
        input.parse::<Token![;]>()?;

        Ok(Method {
            attrs,
            name,
            args: args_parsed.into_iter().collect(),
            ret,
        })
    }
}

fn parse_methods(content: ParseStream) -> Result<Vec<Method>> {
    let mut methods = Vec::new();
    while !content.is_empty() {
        methods.push(content.parse()?);
    }
    Ok(methods)
}

/// The full com_interface input
struct ComInterface {
    attrs: Vec<Attribute>,
    interface: Ident,
    vtable_type: Ident,
    methods: Vec<Method>,
}

impl Parse for ComInterface {
    fn parse(input: ParseStream) -> Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let interface: Ident = input.parse()?;

        let content;
        braced!(content in input);

        // vtable: VtableType,
        let vtable_kw: Ident = content.parse()?;
        if vtable_kw != "vtable" {
            return Err(syn::Error::new(vtable_kw.span(), "expected `vtable`"));
        }
        content.parse::<Token![:]>()?;
        let vtable_type: Ident = content.parse()?;
        content.parse::<Token![,]>()?;

        let methods = parse_methods(&content)?;

        Ok(ComInterface {
            attrs,
            interface,
            vtable_type,
            methods,
        })
    }
}

/// The full native_exports input
struct NativeExports {
    attrs: Vec<Attribute>,
    vis: Visibility,
    table: Ident,
    methods: Vec<Method>,
}

impl Parse for NativeExports {
    fn parse(input: ParseStream) -> Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis: Visibility = input.parse()?;
        input.parse::<Token![struct]>()?;
        let table: Ident = input.parse()?;

        let content;
        braced!(content in input);
        let methods = parse_methods(&content)?;

        Ok(NativeExports {
            attrs,
            vis,
            table,
            methods,
        })
    }
}

/// Converts a Windows-style identifier to snake case.
///
/// Runs of capitals and digits stay together, so `D3DCompile` becomes
/// `d3d_compile` and `GetBufferSize` becomes `get_buffer_size`.
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase() || (prev.is_uppercase() && next_lower) {
                    result.push('_');
                }
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

fn generate_vtable_field(interface: &Ident, method: &Method) -> TokenStream2 {
    let method_name = &method.name;
    let ret = &method.ret;
    let arg_types: Vec<_> = method.args.iter().map(|(_, ty)| ty).collect();

    quote! {
        pub #method_name: unsafe extern "system" fn(*mut #interface, #(#arg_types),*) -> #ret
    }
}

fn generate_method_call(method: &Method) -> TokenStream2 {
    let attrs = &method.attrs;
    let method_name = &method.name;
    let fn_name = format_ident!("{}", to_snake_case(&method_name.to_string()));
    let ret = &method.ret;
    let arg_names: Vec<_> = method.args.iter().map(|(name, _)| name).collect();
    let arg_types: Vec<_> = method.args.iter().map(|(_, ty)| ty).collect();
    let doc = format!("Calls `{}` through the vtable.", method_name);

    quote! {
        #(#attrs)*
        #[doc = #doc]
        ///
        /// # Safety
        /// `this` must point to a live object implementing this interface.
        #[inline]
        pub unsafe fn #fn_name(this: *mut Self #(, #arg_names: #arg_types)*) -> #ret {
            unsafe { ((*(*this).vtable).#method_name)(this #(, #arg_names)*) }
        }
    }
}

/// Declares a COM interface layout: the interface struct, its vtable with
/// `extern "system"` slots in declaration order, and inline call helpers.
#[proc_macro]
pub fn com_interface(input: TokenStream) -> TokenStream {
    let iface = parse_macro_input!(input as ComInterface);

    let attrs = &iface.attrs;
    let interface = &iface.interface;
    let vtable_type = &iface.vtable_type;

    let vtable_fields: Vec<_> = iface
        .methods
        .iter()
        .map(|m| generate_vtable_field(interface, m))
        .collect();

    let calls: Vec<_> = iface.methods.iter().map(generate_method_call).collect();

    let expanded = quote! {
        #(#attrs)*
        #[repr(C)]
        pub struct #interface {
            pub vtable: *const #vtable_type,
        }

        #[repr(C)]
        pub struct #vtable_type {
            #(#vtable_fields),*
        }

        impl #interface {
            #(#calls)*
        }
    };

    TokenStream::from(expanded)
}

/// Declares the functions exported by a native library and generates a
/// function table that resolves every export from a `libloading::Library`.
#[proc_macro]
pub fn native_exports(input: TokenStream) -> TokenStream {
    let exports = parse_macro_input!(input as NativeExports);

    let attrs = &exports.attrs;
    let vis = &exports.vis;
    let table = &exports.table;

    let pfn_types: Vec<_> = exports
        .methods
        .iter()
        .map(|m| {
            let pfn = format_ident!("PFN_{}", m.name);
            let ret = &m.ret;
            let method_attrs = &m.attrs;
            let args: Vec<_> = m
                .args
                .iter()
                .map(|(name, ty)| quote! { #name: #ty })
                .collect();
            quote! {
                #(#method_attrs)*
                #[allow(non_camel_case_types)]
                #vis type #pfn = unsafe extern "system" fn(#(#args),*) -> #ret;
            }
        })
        .collect();

    let fields: Vec<_> = exports
        .methods
        .iter()
        .map(|m| {
            let field = format_ident!("{}", to_snake_case(&m.name.to_string()));
            let pfn = format_ident!("PFN_{}", m.name);
            quote! { pub #field: #pfn }
        })
        .collect();

    let resolvers: Vec<_> = exports
        .methods
        .iter()
        .map(|m| {
            let field = format_ident!("{}", to_snake_case(&m.name.to_string()));
            let pfn = format_ident!("PFN_{}", m.name);
            let name = m.name.to_string();
            let symbol = LitByteStr::new(format!("{}\0", name).as_bytes(), m.name.span());
            quote! {
                #field: *library.get::<#pfn>(#symbol).map_err(|e| {
                    crate::D3DCompilerError::FunctionNotFound(format!("{}: {}", #name, e))
                })?
            }
        })
        .collect();

    let names: Vec<_> = exports.methods.iter().map(|m| m.name.to_string()).collect();

    let expanded = quote! {
        #(#pfn_types)*

        #(#attrs)*
        #[derive(Clone, Copy)]
        #vis struct #table {
            #(#fields),*
        }

        impl #table {
            /// Names of every export this table resolves, in declaration order.
            pub const SYMBOLS: &'static [&'static str] = &[#(#names),*];

            /// Resolves every export from `library`.
            ///
            /// # Safety
            /// The library's exports must match the declared signatures, and the
            /// library must stay loaded for as long as the table is used.
            pub unsafe fn resolve(library: &::libloading::Library) -> crate::Result<Self> {
                unsafe {
                    Ok(#table {
                        #(#resolvers),*
                    })
                }
            }
        }

        impl ::std::fmt::Debug for #table {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!(#table))
                    .field("symbols", &Self::SYMBOLS)
                    .finish()
            }
        }
    };

    TokenStream::from(expanded)
}
