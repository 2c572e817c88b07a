use actix_web::web::{scope, ServiceConfig};

use crate::modules::{conversation::handle::*, message, receipt};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/conversations")
            .service(list_conversations)
            .service(create_conversation)
            .service(get_conversation)
            .service(message::handle::list_messages)
            .service(receipt::handle::mark_conversation_read)
            .service(add_member)
            .service(remove_member),
    );
}
