use axum::response::Html;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Landing page HTML", content_type = "text/html")
    ),
    tag = "General"
)]
pub async fn root() -> Html<&'static str> {
    Html(r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <meta name="viewport" content="width=device-width, initial-scale=1.0">
            <title>Dumb Goodies</title>
            <style>
                body {
                    display: flex;
                    flex-direction: column;
                    justify-content: center;
                    align-items: center;
                    min-height: 100vh;
                    margin: 0;
                    font-family: Arial, sans-serif;
                    background-color: #fafafa;
                }
                h1 { color: #111; font-size: 3rem; margin-bottom: 0; }
                p { color: #555; max-width: 32rem; text-align: center; }
                ol { color: #555; }
                a.button {
                    margin-top: 20px;
                    padding: 10px 20px;
                    background-color: #111;
                    color: white;
                    text-decoration: none;
                    border-radius: 5px;
                    font-weight: bold;
                }
            </style>
        </head>
        <body>
            <h1>Dumb Goodies</h1>
            <p>Upload a logo, get pitched two gloriously useless products, and see them rendered with your brand on them.</p>
            <ol>
                <li><code>POST /api/upload</code> your logo</li>
                <li><code>POST /api/propose</code> a brand for product ideas</li>
                <li><code>POST /api/render</code> the ideas you like</li>
                <li><code>POST /api/save</code> the keepers to the <code>/api/gallery</code></li>
            </ol>
            <a class="button" href="/swagger-ui/">Explore API Docs</a>
        </body>
        </html>
    "#)
}
