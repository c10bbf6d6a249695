use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type,
};

/// Run an asynchronous test against a fresh MongoDB database, injecting
/// dependencies and dropping the database whether or not the test panics.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`mongodb::Database`], `crate::store::MongoStore` and
/// `crate::model::mongodb::Coll<T>`.
///
/// The test is skipped, with a note on stderr, when `ROCKET_DB_URI` is unset.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "`backend_test` takes no arguments",
        )
        .into_compile_error()
        .into();
    }

    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let (test_args, collection_idents, collection_types) = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    quote! {
        #[test]
        fn #name() {
            let db_uri = match std::env::var("ROCKET_DB_URI") {
                Ok(uri) => uri,
                Err(_) => {
                    eprintln!("skipping {}: ROCKET_DB_URI is not set", stringify!(#name));
                    return;
                }
            };

            /// Test setup.
            async fn setup(
                db_uri: String,
            ) -> (
                rocket::local::asynchronous::Client,
                mongodb::Database,
                crate::store::MongoStore,
                tempfile::TempDir,
            ) {
                let db_client = mongodb::Client::with_uri_str(&db_uri).await.unwrap();
                let db_name = format!("ballots_test{}", rand::random::<u32>());
                let db = db_client.database(&db_name);
                let responses = tempfile::tempdir().unwrap();
                let rocket = crate::rocket_for_db(db_client.clone(), &db, responses.path()).await;
                let rocket_client = rocket::local::asynchronous::Client::tracked(rocket)
                    .await
                    .unwrap();
                let store = crate::store::MongoStore::new(db_client, &db);

                (rocket_client, db, store, responses)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: mongodb::Database) {
                db.drop(None).await.unwrap();
            }

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("backend-test")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async move {
                let (rocket_client, db, store, responses) = setup(db_uri).await;
                let test_db = db.clone();

                // A spawned task turns a panic into a `JoinError`, so cleanup
                // still runs before the panic is passed on.
                let outcome = rocket::tokio::spawn(async move {
                    #(
                        let #collection_idents = crate::model::mongodb::Coll::<#collection_types>::from_db(&db);
                    )*
                    #[allow(unused_variables)]
                    let (rocket_client, db, store) = (rocket_client, db, store);
                    #new_name(#(#test_args),* #(,#collection_idents)*).await;
                })
                .await;

                cleanup(test_db).await;
                drop(responses);

                if let Err(err) = outcome {
                    match err.try_into_panic() {
                        Ok(cause) => std::panic::resume_unwind(cause),
                        Err(err) => panic!("test task did not finish: {err}"),
                    }
                }
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
#[allow(clippy::type_complexity)]
fn check_sig(sig: Signature) -> Result<(Vec<TokenStream2>, Vec<Ident>, Vec<Ident>), syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_db = false;
    let mut has_store = false;
    let mut args = vec![];
    let mut collection_idents = vec![];
    let mut collection_types = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(pat_ident) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        let (seen, injected, full_name) = if type_ident == "Client" {
                            (
                                &mut has_client,
                                quote! { rocket_client },
                                "rocket::local::asynchronous::Client",
                            )
                        } else if type_ident == "Database" {
                            (&mut has_db, quote! { db }, "mongodb::Database")
                        } else if type_ident == "MongoStore" {
                            (&mut has_store, quote! { store }, "crate::store::MongoStore")
                        } else {
                            return Err(unexpected_param(input));
                        };
                        if *seen {
                            return Err(syn::Error::new(
                                input.span(),
                                format!("Test cannot accept more than one `{full_name}`"),
                            ));
                        }
                        *seen = true;
                        args.push(injected);
                        continue;
                    }

                    // The last path segment names the type itself.
                    if let Some(possible_collection) = type_path.path.segments.last() {
                        if possible_collection.ident == "Coll" {
                            if let PathArguments::AngleBracketed(generics) =
                                &possible_collection.arguments
                            {
                                if let Some(GenericArgument::Type(Type::Path(type_path))) =
                                    generics.args.first()
                                {
                                    if let Some(type_ident) = type_path.path.get_ident() {
                                        collection_idents.push(pat_ident.ident.clone());
                                        collection_types.push(type_ident.clone());
                                        continue;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        return Err(unexpected_param(input));
    }

    Ok((args, collection_idents, collection_types))
}

fn unexpected_param(input: &FnArg) -> syn::Error {
    syn::Error::new(
        input.span(),
        "Expected one of `client_ident: Client`, `db_ident: Database`, \
         `store_ident: MongoStore` or `collection_ident: Coll<T>`",
    )
}
