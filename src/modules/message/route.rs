use actix_web::web::{scope, ServiceConfig};

use crate::modules::{message::handle::*, receipt};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/messages")
            .service(send_message)
            .service(receipt::handle::unread_counts)
            .service(receipt::handle::mark_delivered)
            .service(receipt::handle::mark_read)
            .service(receipt::handle::list_receipts),
    );
}
